// FrameInfo construction, equality and conversion from the native representation.

#[cfg(test)]
mod frame_info {
    use jpegls_native::native::FrameInfoNative;
    use jpegls_native::{CodecError, FrameInfo};
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(frame_info: &FrameInfo) -> u64 {
        let mut hasher = DefaultHasher::new();
        frame_info.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_construct() {
        let frame_info = FrameInfo::new(256, 1024, 8, 3).unwrap();
        assert_eq!(frame_info.width(), 256);
        assert_eq!(frame_info.height(), 1024);
        assert_eq!(frame_info.bits_per_sample(), 8);
        assert_eq!(frame_info.component_count(), 3);
    }

    #[test]
    fn test_equal_values() {
        let a = FrameInfo::new(256, 1024, 8, 3).unwrap();
        let b = FrameInfo::new(256, 1024, 8, 3).unwrap();
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_different_values() {
        let a = FrameInfo::new(256, 1024, 8, 3).unwrap();
        for b in [
            FrameInfo::new(256, 1024, 8, 4).unwrap(),
            FrameInfo::new(255, 1024, 8, 3).unwrap(),
            FrameInfo::new(256, 1023, 8, 3).unwrap(),
            FrameInfo::new(256, 1024, 12, 3).unwrap(),
        ] {
            assert_ne!(a, b);
            assert_ne!(b, a);
        }
    }

    #[test]
    fn test_unset_is_not_equal_to_set() {
        let a = Some(FrameInfo::new(256, 1024, 8, 3).unwrap());
        assert_ne!(a, None);
    }

    #[test]
    fn test_native_width_too_large() {
        let native = FrameInfoNative {
            width: u32::MAX,
            ..Default::default()
        };
        assert_eq!(
            FrameInfo::from_native(&native),
            Err(CodecError::Overflow {
                field: "width",
                value: u32::MAX
            })
        );
    }

    #[test]
    fn test_native_height_too_large() {
        let native = FrameInfoNative {
            height: u32::MAX,
            ..Default::default()
        };
        assert_eq!(
            FrameInfo::from_native(&native),
            Err(CodecError::Overflow {
                field: "height",
                value: u32::MAX
            })
        );
    }

    #[test]
    fn test_native_round_trip() {
        let frame_info = FrameInfo::new(640, 480, 12, 1).unwrap();
        let native = frame_info.to_native();
        assert_eq!(native.width, 640);
        assert_eq!(native.height, 480);
        assert_eq!(FrameInfo::from_native(&native), Ok(frame_info));
    }

    #[test]
    fn test_bounds_are_argument_errors() {
        for (width, height, bits_per_sample, component_count) in [
            (0, 1, 8, 1),
            (65536, 1, 8, 1),
            (1, 0, 8, 1),
            (1, 1, 1, 1),
            (1, 1, 17, 1),
            (1, 1, 8, 0),
            (1, 1, 8, 256),
        ] {
            assert!(matches!(
                FrameInfo::new(width, height, bits_per_sample, component_count),
                Err(CodecError::InvalidArgument(..))
            ));
        }
    }
}
