// Encoder/decoder session tests: round trips, header errors, call ordering
// and SPIFF headers.

#[cfg(test)]
mod codec {
    use jpegls_native::{
        CodecError, EncodeOptions, FrameInfo, InterleaveMode, JpegLsDecoder, JpegLsEncoder, JpeglsErrc,
        JpeglsPcParameters, SpiffColorSpace, SpiffCompressionType, SpiffHeader, SpiffHeaderCodec, SpiffProfileId,
        SpiffResolutionUnits, decode, encode, encode_with_options,
    };

    fn encode_with_encoder(frame_info: FrameInfo, pixels: &[u8]) -> Vec<u8> {
        let mut encoder = JpegLsEncoder::with_frame_info(frame_info).unwrap();
        let mut encoded = vec![0u8; encoder.estimated_destination_size().unwrap()];
        encoder.set_destination(&mut encoded).unwrap();
        encoder.encode(pixels).unwrap();
        let bytes_written = encoder.bytes_written().unwrap();
        drop(encoder);
        encoded.truncate(bytes_written);
        encoded
    }

    fn decode_with_decoder(encoded: &[u8]) -> Vec<u8> {
        let mut decoder = JpegLsDecoder::new(encoded).unwrap();
        decoder.read_header().unwrap();
        decoder.decode().unwrap()
    }

    /// Deterministic noise so failures are reproducible.
    fn noise(length: usize, maximum: u16, seed: u32) -> Vec<u16> {
        let mut state = seed;
        (0..length)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((state >> 16) % (u32::from(maximum) + 1)) as u16
            })
            .collect()
    }

    fn to_le_bytes(samples: &[u16]) -> Vec<u8> {
        samples.iter().flat_map(|sample| sample.to_le_bytes()).collect()
    }

    /// ITU-T T.87 Annex H.3: a 4x4 8-bit image and its lossless encoding with
    /// default coding parameters.
    const H3_PIXELS: [u8; 16] = [0, 0, 90, 74, 68, 50, 43, 205, 64, 145, 145, 145, 100, 145, 145, 145];
    const H3_ENCODED: [u8; 57] = [
        0xFF, 0xD8, 0xFF, 0xF7, 0x00, 0x0B, 0x08, 0x00, 0x04, 0x00, 0x04, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xDA, 0x00,
        0x08, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x6C, 0x80, 0x20, 0x8E, 0x01, 0xC0, 0x00, 0x00,
        0x57, 0x40, 0x00, 0x00, 0x6E, 0xE6, 0x00, 0x00, 0x01, 0xBC, 0x18, 0x00, 0x00, 0x05, 0xD8, 0x00, 0x00, 0x91,
        0x60, 0xFF, 0xD9,
    ];

    /// SOI, a frame header for 65535x65535, 16 bits, 255 components, and the
    /// header of a scan over the first component. No scan data follows.
    fn largest_frame_header() -> Vec<u8> {
        let component_count = 255u8;
        let frame_length = 8 + 3 * u16::from(component_count);
        let mut stream = vec![0xFF, 0xD8, 0xFF, 0xF7];
        stream.extend_from_slice(&frame_length.to_be_bytes());
        stream.push(16);
        stream.extend_from_slice(&u16::MAX.to_be_bytes());
        stream.extend_from_slice(&u16::MAX.to_be_bytes());
        stream.push(component_count);
        for id in 1..=component_count {
            stream.extend_from_slice(&[id, 0x11, 0x00]);
        }
        stream.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00]);
        stream
    }

    #[test]
    fn test_one_by_one_color() {
        let pixels = [77u8, 33, 255];
        let encoded = encode_with_encoder(FrameInfo::new(1, 1, 8, 3).unwrap(), &pixels);
        assert_eq!(decode_with_decoder(&encoded), pixels);
    }

    #[test]
    fn test_two_bit_monochrome() {
        let pixels = [1u8];
        let encoded = encode_with_encoder(FrameInfo::new(1, 1, 2, 1).unwrap(), &pixels);
        assert_eq!(decode_with_decoder(&encoded), pixels);
    }

    #[test]
    fn test_missing_marker_start_byte() {
        assert_eq!(
            decode(&[0x33, 0x33]),
            Err(CodecError::JpegMarkerStartByteNotFound)
        );
    }

    #[test]
    fn test_huffman_lossless_is_not_supported() {
        assert_eq!(
            decode(&[0xFF, 0xD8, 0xFF, 0xC3, 0x00, 0x00]),
            Err(CodecError::EncodingNotSupported)
        );
    }

    #[test]
    fn test_unknown_marker() {
        assert_eq!(
            decode(&[0xFF, 0xD8, 0xFF, 0x01, 0x00, 0x00]),
            Err(CodecError::UnknownJpegMarkerFound)
        );
    }

    #[test]
    fn test_truncated_stream_reports_native_code() {
        let pixels: Vec<u8> = noise(64, 255, 1).into_iter().map(|value| value as u8).collect();
        let encoded = encode(&FrameInfo::new(8, 8, 8, 1).unwrap(), &pixels).unwrap();
        let error = decode(&encoded[..encoded.len() - 10]).unwrap_err();
        assert!(matches!(error, CodecError::NativeFailure { .. }));
        assert!(error.native_code().is_some());
    }

    #[test]
    fn test_spiff_header_after_destination() {
        let mut encoder = JpegLsEncoder::with_frame_info(FrameInfo::new(1, 1, 8, 1).unwrap()).unwrap();
        let mut destination = vec![0u8; 1024];
        encoder.set_destination(&mut destination).unwrap();
        assert!(matches!(
            encoder.write_standard_spiff_header(SpiffColorSpace::Grayscale, SpiffResolutionUnits::AspectRatio, 1, 1),
            Err(CodecError::InvalidOperationOrder(..))
        ));
    }

    #[test]
    fn test_spiff_header_before_frame_info() {
        let mut encoder = JpegLsEncoder::new().unwrap();
        assert!(matches!(
            encoder.write_standard_spiff_header(SpiffColorSpace::Grayscale, SpiffResolutionUnits::AspectRatio, 1, 1),
            Err(CodecError::InvalidOperationOrder(..))
        ));
    }

    #[test]
    fn test_dispose_twice() {
        let mut encoder = JpegLsEncoder::new().unwrap();
        encoder.close();
        encoder.close();
        drop(encoder);

        let source = [0xFFu8, 0xD8];
        let mut decoder = JpegLsDecoder::new(&source).unwrap();
        decoder.close();
        decoder.close();
        drop(decoder);
    }

    #[test]
    fn test_queries_before_their_state() {
        let mut encoder = JpegLsEncoder::new().unwrap();
        assert!(matches!(
            encoder.estimated_destination_size(),
            Err(CodecError::InvalidOperationOrder(..))
        ));
        assert!(matches!(
            encoder.bytes_written(),
            Err(CodecError::InvalidOperationOrder(..))
        ));

        let mut destination = [0u8; 16];
        assert!(matches!(
            encoder.set_destination(&mut destination),
            Err(CodecError::InvalidOperationOrder(..))
        ));
    }

    #[test]
    fn test_encode_twice() {
        let frame_info = FrameInfo::new(2, 2, 8, 1).unwrap();
        let mut encoder = JpegLsEncoder::with_frame_info(frame_info).unwrap();
        let mut destination = vec![0u8; encoder.estimated_destination_size().unwrap()];
        encoder.set_destination(&mut destination).unwrap();
        encoder.encode(&[1, 2, 3, 4]).unwrap();
        assert!(matches!(
            encoder.encode(&[1, 2, 3, 4]),
            Err(CodecError::InvalidOperationOrder(..))
        ));
        assert!(matches!(
            encoder.set_near_lossless(1),
            Err(CodecError::InvalidOperationOrder(..))
        ));
    }

    #[test]
    fn test_read_header_twice_and_decode_twice() {
        let encoded = encode(&FrameInfo::new(2, 2, 8, 1).unwrap(), &[1, 2, 3, 4]).unwrap();
        let mut decoder = JpegLsDecoder::new(&encoded).unwrap();
        decoder.read_header().unwrap();
        assert!(matches!(
            decoder.read_header(),
            Err(CodecError::InvalidOperationOrder(..))
        ));
        assert_eq!(decoder.decode().unwrap(), [1, 2, 3, 4]);
        assert!(matches!(
            decoder.decode(),
            Err(CodecError::InvalidOperationOrder(..))
        ));
    }

    #[test]
    fn test_destination_too_small() {
        let frame_info = FrameInfo::new(16, 16, 8, 1).unwrap();
        let pixels: Vec<u8> = noise(256, 255, 3).into_iter().map(|value| value as u8).collect();
        let mut encoder = JpegLsEncoder::with_frame_info(frame_info).unwrap();
        let mut destination = vec![0u8; 40];
        encoder.set_destination(&mut destination).unwrap();

        let error = encoder.encode(&pixels).unwrap_err();
        assert_eq!(
            error,
            CodecError::NativeFailure {
                code: 3,
                errc: Some(JpeglsErrc::DestinationBufferTooSmall)
            }
        );
        assert!(matches!(
            encoder.bytes_written(),
            Err(CodecError::InvalidOperationOrder(..))
        ));
    }

    #[test]
    fn test_source_smaller_than_frame() {
        let mut encoder = JpegLsEncoder::with_frame_info(FrameInfo::new(4, 4, 8, 1).unwrap()).unwrap();
        let mut destination = vec![0u8; encoder.estimated_destination_size().unwrap()];
        encoder.set_destination(&mut destination).unwrap();
        assert!(matches!(
            encoder.encode(&[0u8; 15]),
            Err(CodecError::InvalidArgument(..))
        ));
    }

    #[test]
    fn test_standard_spiff_header_round_trip() {
        let frame_info = FrameInfo::new(3, 2, 8, 3).unwrap();
        let pixels: Vec<u8> = (0..18).map(|value| value * 13).collect();

        let mut encoder = JpegLsEncoder::with_frame_info(frame_info).unwrap();
        encoder.set_interleave_mode(InterleaveMode::Sample).unwrap();
        encoder
            .write_standard_spiff_header(SpiffColorSpace::Rgb, SpiffResolutionUnits::DotsPerInch, 300, 200)
            .unwrap();
        let mut encoded = vec![0u8; encoder.estimated_destination_size().unwrap()];
        encoder.set_destination(&mut encoded).unwrap();
        encoder.encode(&pixels).unwrap();
        let bytes_written = encoder.bytes_written().unwrap();
        drop(encoder);
        encoded.truncate(bytes_written);

        let expected = SpiffHeader::standard(
            &frame_info,
            SpiffColorSpace::Rgb,
            SpiffResolutionUnits::DotsPerInch,
            300,
            200,
        );
        assert_eq!(&encoded[..2], &[0xFF, 0xD8]);
        assert_eq!(&encoded[2..36], &SpiffHeaderCodec::encode(&expected).unwrap());
        assert_eq!(&encoded[36..46], &SpiffHeaderCodec::END_OF_DIRECTORY);

        let mut decoder = JpegLsDecoder::new(&encoded).unwrap();
        decoder.read_header().unwrap();
        assert_eq!(decoder.spiff_header(), Some(&expected));
        assert_eq!(decoder.frame_info(), Some(frame_info));
        assert_eq!(decoder.interleave_mode(), Some(InterleaveMode::Sample));
        assert_eq!(decoder.decode().unwrap(), pixels);
    }

    #[test]
    fn test_custom_spiff_header() {
        let frame_info = FrameInfo::new(4, 4, 12, 1).unwrap();
        let header = SpiffHeader {
            profile_id: SpiffProfileId::None,
            component_count: 1,
            height: 4,
            width: 4,
            color_space: SpiffColorSpace::Grayscale,
            bits_per_sample: 12,
            compression_type: SpiffCompressionType::JpegLs,
            resolution_units: SpiffResolutionUnits::DotsPerCentimeter,
            vertical_resolution: 72,
            horizontal_resolution: 96,
        };
        let pixels = to_le_bytes(&noise(16, 4095, 11));

        let mut encoder = JpegLsEncoder::with_frame_info(frame_info).unwrap();
        encoder.write_spiff_header(&header).unwrap();
        let mut encoded = vec![0u8; encoder.estimated_destination_size().unwrap()];
        encoder.set_destination(&mut encoded).unwrap();
        encoder.encode(&pixels).unwrap();
        drop(encoder);

        let mut decoder = JpegLsDecoder::new(&encoded).unwrap();
        decoder.read_header().unwrap();
        assert_eq!(decoder.spiff_header(), Some(&header));
        assert_eq!(decoder.decode().unwrap(), pixels);
    }

    #[test]
    fn test_custom_spiff_header_must_describe_frame() {
        let frame_info = FrameInfo::new(4, 4, 8, 1).unwrap();
        let mut header = SpiffHeader::standard(
            &frame_info,
            SpiffColorSpace::Grayscale,
            SpiffResolutionUnits::AspectRatio,
            1,
            1,
        );
        header.width = 5;

        let mut encoder = JpegLsEncoder::with_frame_info(frame_info).unwrap();
        assert!(matches!(
            encoder.write_spiff_header(&header),
            Err(CodecError::InvalidArgument(..))
        ));

        header.width = 4;
        header.color_space = SpiffColorSpace::Cmyk;
        assert!(matches!(
            encoder.write_spiff_header(&header),
            Err(CodecError::InvalidArgument(..))
        ));
    }

    #[test]
    fn test_stream_without_spiff_header() {
        let encoded = encode(&FrameInfo::new(2, 1, 8, 1).unwrap(), &[9, 200]).unwrap();
        let mut decoder = JpegLsDecoder::new(&encoded).unwrap();
        decoder.read_header().unwrap();
        assert_eq!(decoder.spiff_header(), None);
        assert_eq!(decoder.near_lossless(), Some(0));
    }

    #[test]
    fn test_interleave_modes() {
        let frame_info = FrameInfo::new(17, 9, 8, 3).unwrap();
        let pixels: Vec<u8> = noise(17 * 9 * 3, 255, 5).into_iter().map(|value| value as u8).collect();

        for interleave_mode in [InterleaveMode::None, InterleaveMode::Line, InterleaveMode::Sample] {
            let options = EncodeOptions {
                interleave_mode,
                ..Default::default()
            };
            let encoded = encode_with_options(&frame_info, &pixels, &options).unwrap();

            let mut decoder = JpegLsDecoder::new(&encoded).unwrap();
            decoder.read_header().unwrap();
            assert_eq!(decoder.interleave_mode(), Some(interleave_mode));
            assert_eq!(decoder.decode().unwrap(), pixels, "{interleave_mode:?}");
        }
    }

    #[test]
    fn test_interleave_mode_needs_several_components() {
        let frame_info = FrameInfo::new(2, 2, 8, 1).unwrap();
        let options = EncodeOptions {
            interleave_mode: InterleaveMode::Line,
            ..Default::default()
        };
        assert!(matches!(
            encode_with_options(&frame_info, &[0; 4], &options),
            Err(CodecError::InvalidArgument(..))
        ));
    }

    #[test]
    fn test_near_lossless_error_is_bounded() {
        let frame_info = FrameInfo::new(32, 16, 8, 1).unwrap();
        let pixels: Vec<u8> = noise(32 * 16, 255, 7).into_iter().map(|value| value as u8).collect();
        let options = EncodeOptions {
            near_lossless: 3,
            ..Default::default()
        };
        let encoded = encode_with_options(&frame_info, &pixels, &options).unwrap();

        let mut decoder = JpegLsDecoder::new(&encoded).unwrap();
        decoder.read_header().unwrap();
        assert_eq!(decoder.near_lossless(), Some(3));
        let decoded = decoder.decode().unwrap();
        for (expected, decoded) in pixels.iter().zip(&decoded) {
            assert!((i32::from(*expected) - i32::from(*decoded)).abs() <= 3);
        }
    }

    #[test]
    fn test_near_lossless_above_half_range_is_rejected() {
        let frame_info = FrameInfo::new(1, 1, 2, 1).unwrap();
        let options = EncodeOptions {
            near_lossless: 2,
            ..Default::default()
        };
        assert!(matches!(
            encode_with_options(&frame_info, &[1], &options),
            Err(CodecError::InvalidArgument(..))
        ));
    }

    #[test]
    fn test_stride_padding() {
        let frame_info = FrameInfo::new(3, 2, 8, 1).unwrap();
        let padded = [1u8, 2, 3, 0xEE, 0xEE, 4, 5, 6];
        let options = EncodeOptions {
            stride: 5,
            ..Default::default()
        };
        let encoded = encode_with_options(&frame_info, &padded, &options).unwrap();
        assert_eq!(decode(&encoded).unwrap(), [1, 2, 3, 4, 5, 6]);

        let mut decoder = JpegLsDecoder::new(&encoded).unwrap();
        decoder.read_header().unwrap();
        assert_eq!(decoder.destination_size(4).unwrap(), 7);
        let mut destination = [0u8; 7];
        decoder.decode_into(&mut destination, 4).unwrap();
        assert_eq!(destination, [1, 2, 3, 0, 4, 5, 6]);
    }

    #[test]
    fn test_decoder_rejects_bad_stride_before_native_call() {
        let frame_info = FrameInfo::new(3, 2, 8, 1).unwrap();
        let encoded = encode(&frame_info, &[1, 2, 3, 4, 5, 6]).unwrap();
        let mut decoder = JpegLsDecoder::new(&encoded).unwrap();
        decoder.read_header().unwrap();

        let error = decoder.destination_size(1).unwrap_err();
        assert!(matches!(error, CodecError::InvalidArgument(..)));
        assert_eq!(error.native_code(), None);
        assert!(matches!(
            decoder.decode_into(&mut [0u8; 8], 2),
            Err(CodecError::InvalidArgument(..))
        ));
        assert!(matches!(
            decoder.decode_into(&mut [0u8; 5], 0),
            Err(CodecError::InvalidArgument(..))
        ));

        assert_eq!(decoder.decode().unwrap(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_huge_frame_reports_out_of_resources() {
        let stream = largest_frame_header();
        let mut decoder = JpegLsDecoder::new(&stream).unwrap();
        decoder.read_header().unwrap();
        assert_eq!(
            decoder.frame_info(),
            Some(FrameInfo::new(65535, 65535, 16, 255).unwrap())
        );

        assert_eq!(decode(&stream), Err(CodecError::OutOfResources));
    }

    #[test]
    fn test_decode_h3_reference_stream() {
        assert_eq!(decode(&H3_ENCODED).unwrap(), H3_PIXELS);
    }

    #[test]
    fn test_encode_matches_h3_reference_stream() {
        let frame_info = FrameInfo::new(4, 4, 8, 1).unwrap();
        assert_eq!(encode(&frame_info, &H3_PIXELS).unwrap(), H3_ENCODED);
    }

    #[test]
    fn test_sample_above_precision_is_rejected() {
        let frame_info = FrameInfo::new(2, 1, 2, 1).unwrap();
        let error = encode(&frame_info, &[200, 1]).unwrap_err();
        assert!(matches!(error, CodecError::InvalidArgument(..)));
        assert_eq!(error.native_code(), Some(JpeglsErrc::InvalidArgument.code()));
        assert_eq!(decode(&encode(&frame_info, &[3, 1]).unwrap()).unwrap(), [3, 1]);
    }

    #[test]
    fn test_stride_smaller_than_row() {
        let frame_info = FrameInfo::new(3, 2, 8, 1).unwrap();
        let options = EncodeOptions {
            stride: 2,
            ..Default::default()
        };
        assert!(matches!(
            encode_with_options(&frame_info, &[0; 8], &options),
            Err(CodecError::InvalidArgument(..))
        ));
    }

    #[test]
    fn test_sixteen_bit_samples() {
        let frame_info = FrameInfo::new(13, 7, 16, 1).unwrap();
        let pixels = to_le_bytes(&noise(13 * 7, u16::MAX, 13));
        let encoded = encode(&frame_info, &pixels).unwrap();
        assert_eq!(decode(&encoded).unwrap(), pixels);
    }

    #[test]
    fn test_preset_coding_parameters() {
        let frame_info = FrameInfo::new(8, 8, 8, 1).unwrap();
        let pixels: Vec<u8> = (0..64).collect();
        let pc_parameters = JpeglsPcParameters {
            reset_value: 32,
            ..Default::default()
        };
        let options = EncodeOptions {
            preset_coding_parameters: Some(pc_parameters),
            ..Default::default()
        };
        let encoded = encode_with_options(&frame_info, &pixels, &options).unwrap();

        let mut decoder = JpegLsDecoder::new(&encoded).unwrap();
        decoder.read_header().unwrap();
        assert_eq!(decoder.preset_coding_parameters().unwrap().reset_value, 32);
        assert_eq!(decoder.decode().unwrap(), pixels);
    }

    #[test]
    fn test_one_shot_spiff_option() {
        let frame_info = FrameInfo::new(2, 2, 8, 3).unwrap();
        let pixels = [10u8, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120];
        let options = EncodeOptions {
            interleave_mode: InterleaveMode::Line,
            spiff_color_space: Some(SpiffColorSpace::Rgb),
            ..Default::default()
        };
        let encoded = encode_with_options(&frame_info, &pixels, &options).unwrap();
        assert_eq!(SpiffHeaderCodec::decode(&encoded[2..36]).unwrap().unwrap().color_space, SpiffColorSpace::Rgb);
        assert_eq!(decode(&encoded).unwrap(), pixels);
    }
}
