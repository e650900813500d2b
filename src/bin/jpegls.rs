//! jpegls CLI - JPEG-LS encoder/decoder command-line utility.
//!
//! Converts raw or PNM (PGM/PPM) pixels to JPEG-LS and back, and prints the
//! header information of JPEG-LS files.

use clap::{Parser, Subcommand, ValueEnum};
use jpegls_native::{
    EncodeOptions, FrameInfo, InterleaveMode, JpegLsDecoder, SpiffColorSpace, encode_with_options,
};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// JPEG-LS (ISO/IEC 14495-1) encoder and decoder
#[derive(Parser)]
#[command(name = "jpegls")]
#[command(version)]
#[command(about = "Encode, decode and inspect JPEG-LS images", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegls encode -i photo.ppm -o photo.jls --interleave sample --spiff
    jpegls encode -i pixels.raw -o image.jls -w 512 -H 512 -b 12
    jpegls decode -i image.jls -o image.pgm -f pnm
    jpegls info -i image.jls

Set RUST_LOG=debug to trace the native codec calls.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode raw or PNM pixels to JPEG-LS
    ///
    /// PNM input (P5/P6) carries its own geometry. Raw input needs --width and
    /// --height; samples above 8 bits are little-endian 16-bit words.
    #[command(visible_alias = "e")]
    Encode {
        /// Input pixel file (raw, PGM or PPM)
        #[arg(short, long)]
        input: PathBuf,

        /// Output JPEG-LS file
        #[arg(short, long)]
        output: PathBuf,

        /// Image width in pixels (raw input only)
        #[arg(short, long)]
        width: Option<u32>,

        /// Image height in pixels (raw input only)
        #[arg(short = 'H', long)]
        height: Option<u32>,

        /// Number of components (raw input only)
        #[arg(short = 'n', long, default_value = "1")]
        components: i32,

        /// Bits per sample (raw input only)
        #[arg(short, long, default_value = "8")]
        bits_per_sample: i32,

        /// Maximum error per sample (0 = lossless)
        #[arg(long, default_value = "0")]
        near_lossless: i32,

        /// Interleave mode for multi-component images
        #[arg(long, default_value = "none", value_enum)]
        interleave: Interleave,

        /// Row stride of raw input in bytes (0 = tightly packed)
        #[arg(long, default_value = "0")]
        stride: u32,

        /// Write a standard SPIFF header
        #[arg(long)]
        spiff: bool,
    },

    /// Decode a JPEG-LS file to raw pixels or PNM
    #[command(visible_alias = "d")]
    Decode {
        /// Input JPEG-LS file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path for decoded pixels
        #[arg(short, long)]
        output: PathBuf,

        /// Output format: raw (as decoded) or pnm (PGM/PPM)
        #[arg(short, long, default_value = "raw", value_enum)]
        format: OutputFormat,
    },

    /// Display the frame, scan and SPIFF header information
    #[command(visible_alias = "i")]
    Info {
        /// Input JPEG-LS file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Interleave {
    /// One scan per component; raw input is planar
    None,
    /// Components interleaved per line
    Line,
    /// Components interleaved per sample
    Sample,
}

impl From<Interleave> for InterleaveMode {
    fn from(interleave: Interleave) -> Self {
        match interleave {
            Interleave::None => InterleaveMode::None,
            Interleave::Line => InterleaveMode::Line,
            Interleave::Sample => InterleaveMode::Sample,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Raw binary pixel data
    Raw,
    /// Portable GrayMap / PixMap
    Pnm,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            width,
            height,
            components,
            bits_per_sample,
            near_lossless,
            interleave,
            stride,
            spiff,
        } => {
            let raw_geometry = RawGeometry {
                width,
                height,
                components,
                bits_per_sample,
                stride,
            };
            encode_image(&input, &output, raw_geometry, near_lossless, interleave.into(), spiff)
        }
        Commands::Decode { input, output, format } => decode_image(&input, &output, format),
        Commands::Info { input } => show_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct RawGeometry {
    width: Option<u32>,
    height: Option<u32>,
    components: i32,
    bits_per_sample: i32,
    stride: u32,
}

fn encode_image(
    input: &PathBuf,
    output: &PathBuf,
    raw_geometry: RawGeometry,
    near_lossless: i32,
    interleave_mode: InterleaveMode,
    spiff: bool,
) -> CliResult<()> {
    let data = fs::read(input)?;

    let (frame_info, mut pixels, stride, from_pnm) = match parse_pnm(&data)? {
        Some(image) => (image.frame_info, image.pixels, 0, true),
        None => {
            let width = raw_geometry.width.ok_or("raw input needs --width")?;
            let height = raw_geometry.height.ok_or("raw input needs --height")?;
            let frame_info = FrameInfo::new(width, height, raw_geometry.bits_per_sample, raw_geometry.components)?;
            (frame_info, data, raw_geometry.stride, false)
        }
    };

    // PNM pixels are always interleaved; a non-interleaved encode wants planes.
    if from_pnm && interleave_mode == InterleaveMode::None && frame_info.component_count() > 1 {
        pixels = interleaved_to_planar(&pixels, &frame_info);
    }

    let options = EncodeOptions {
        interleave_mode,
        near_lossless,
        spiff_color_space: spiff.then(|| spiff_color_space(frame_info.component_count())),
        preset_coding_parameters: None,
        stride,
    };
    let encoded = encode_with_options(&frame_info, &pixels, &options)?;
    fs::write(output, &encoded)?;

    println!(
        "✓ Encoded {}x{} image ({} components, {} bits) to {:?}: {} bytes",
        frame_info.width(),
        frame_info.height(),
        frame_info.component_count(),
        frame_info.bits_per_sample(),
        output,
        encoded.len()
    );
    Ok(())
}

fn decode_image(input: &PathBuf, output: &PathBuf, format: OutputFormat) -> CliResult<()> {
    let data = fs::read(input)?;
    let mut decoder = JpegLsDecoder::new(&data)?;
    decoder.read_header()?;
    let frame_info = decoder.frame_info().ok_or("header did not describe a frame")?;
    let interleave_mode = decoder.interleave_mode().unwrap_or_default();
    let pixels = decoder.decode()?;

    match format {
        OutputFormat::Raw => fs::write(output, &pixels)?,
        OutputFormat::Pnm => {
            let pixels = if interleave_mode == InterleaveMode::None && frame_info.component_count() > 1 {
                planar_to_interleaved(&pixels, &frame_info)
            } else {
                pixels
            };
            write_pnm(output, &pixels, &frame_info)?;
        }
    }

    println!(
        "✓ Decoded {}x{} image ({} components) to {:?}",
        frame_info.width(),
        frame_info.height(),
        frame_info.component_count(),
        output
    );
    Ok(())
}

fn show_info(input: &PathBuf) -> CliResult<()> {
    let data = fs::read(input)?;
    let mut decoder = JpegLsDecoder::new(&data)?;
    decoder.read_header()?;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!();

    if let Some(frame_info) = decoder.frame_info() {
        println!("Frame:");
        println!("  Dimensions: {}x{}", frame_info.width(), frame_info.height());
        println!("  Bit depth:  {} bits", frame_info.bits_per_sample());
        println!("  Components: {}", frame_info.component_count());
    }
    if let (Some(near_lossless), Some(interleave_mode)) = (decoder.near_lossless(), decoder.interleave_mode()) {
        println!("Scan:");
        println!(
            "  Mode:       {}",
            if near_lossless == 0 {
                "Lossless".to_string()
            } else {
                format!("Near-lossless (NEAR={near_lossless})")
            }
        );
        println!("  Interleave: {:?}", interleave_mode);
    }
    if let Some(pc) = decoder.preset_coding_parameters().filter(|pc| *pc != Default::default()) {
        println!("Preset coding parameters:");
        println!("  MAXVAL: {}", pc.maximum_sample_value);
        println!("  T1/T2/T3: {}/{}/{}", pc.threshold1, pc.threshold2, pc.threshold3);
        println!("  RESET: {}", pc.reset_value);
    }
    if let Some(spiff) = decoder.spiff_header() {
        println!("SPIFF header:");
        println!("  Profile:     {:?}", spiff.profile_id);
        println!("  Color space: {:?}", spiff.color_space);
        println!("  Compression: {:?}", spiff.compression_type);
        println!(
            "  Resolution:  {}x{} ({:?})",
            spiff.horizontal_resolution, spiff.vertical_resolution, spiff.resolution_units
        );
    }

    Ok(())
}

// Internal helpers

fn spiff_color_space(component_count: i32) -> SpiffColorSpace {
    match component_count {
        1 => SpiffColorSpace::Grayscale,
        3 => SpiffColorSpace::Rgb,
        4 => SpiffColorSpace::Cmyk,
        _ => SpiffColorSpace::None,
    }
}

struct PnmImage {
    frame_info: FrameInfo,
    pixels: Vec<u8>,
}

/// Parses binary PGM (P5) and PPM (P6). Returns `None` for anything else.
/// 16-bit samples are converted from big-endian to little-endian.
fn parse_pnm(data: &[u8]) -> CliResult<Option<PnmImage>> {
    let component_count = match data.get(..2) {
        Some(b"P5") => 1,
        Some(b"P6") => 3,
        _ => return Ok(None),
    };

    let mut position = 2;
    let mut fields = [0u32; 3];
    for field in &mut fields {
        *field = read_pnm_number(data, &mut position)?;
    }
    // Exactly one whitespace byte separates the header from the pixels.
    position += 1;

    let [width, height, maximum_value] = fields;
    if maximum_value == 0 || maximum_value > 65535 {
        return Err(format!("unsupported PNM maximum value {maximum_value}").into());
    }
    let bits_per_sample = (32 - maximum_value.leading_zeros()).max(2) as i32;
    let frame_info = FrameInfo::new(width, height, bits_per_sample, component_count)?;

    let size = frame_info.pixel_data_size();
    let mut pixels = data
        .get(position..position + size)
        .ok_or("PNM pixel data is truncated")?
        .to_vec();
    if frame_info.bytes_per_sample() == 2 {
        for sample in pixels.chunks_exact_mut(2) {
            sample.swap(0, 1);
        }
    }

    Ok(Some(PnmImage { frame_info, pixels }))
}

fn read_pnm_number(data: &[u8], position: &mut usize) -> CliResult<u32> {
    loop {
        match data.get(*position) {
            Some(b'#') => {
                while data.get(*position).is_some_and(|&byte| byte != b'\n') {
                    *position += 1;
                }
            }
            Some(byte) if byte.is_ascii_whitespace() => *position += 1,
            Some(_) => break,
            None => return Err("PNM header is truncated".into()),
        }
    }

    let start = *position;
    while data.get(*position).is_some_and(u8::is_ascii_digit) {
        *position += 1;
    }
    let text = std::str::from_utf8(&data[start..*position])?;
    Ok(text.parse()?)
}

fn write_pnm(path: &PathBuf, pixels: &[u8], frame_info: &FrameInfo) -> CliResult<()> {
    let magic = match frame_info.component_count() {
        1 => "P5",
        3 => "P6",
        count => return Err(format!("PNM cannot hold {count} components").into()),
    };

    let mut file = fs::File::create(path)?;
    writeln!(file, "{magic}")?;
    writeln!(file, "{} {}", frame_info.width(), frame_info.height())?;
    writeln!(file, "{}", (1u32 << frame_info.bits_per_sample()) - 1)?;
    if frame_info.bytes_per_sample() == 2 {
        let swapped: Vec<u8> = pixels.chunks_exact(2).flat_map(|sample| [sample[1], sample[0]]).collect();
        file.write_all(&swapped)?;
    } else {
        file.write_all(pixels)?;
    }

    Ok(())
}

fn interleaved_to_planar(pixels: &[u8], frame_info: &FrameInfo) -> Vec<u8> {
    let (component_count, sample_size, plane_size) = plane_geometry(frame_info);
    let mut planar = vec![0u8; pixels.len()];
    for (index, sample) in pixels.chunks_exact(sample_size).enumerate() {
        let (pixel, component) = (index / component_count, index % component_count);
        let offset = component * plane_size + pixel * sample_size;
        planar[offset..offset + sample_size].copy_from_slice(sample);
    }
    planar
}

fn planar_to_interleaved(pixels: &[u8], frame_info: &FrameInfo) -> Vec<u8> {
    let (component_count, sample_size, plane_size) = plane_geometry(frame_info);
    let mut interleaved = vec![0u8; pixels.len()];
    for (index, sample) in pixels.chunks_exact(sample_size).enumerate() {
        let (component, pixel) = (index * sample_size / plane_size, index % (plane_size / sample_size));
        let offset = (pixel * component_count + component) * sample_size;
        interleaved[offset..offset + sample_size].copy_from_slice(sample);
    }
    interleaved
}

fn plane_geometry(frame_info: &FrameInfo) -> (usize, usize, usize) {
    let sample_size = frame_info.bytes_per_sample();
    let plane_size = frame_info.width() as usize * frame_info.height() as usize * sample_size;
    (frame_info.component_count() as usize, sample_size, plane_size)
}
