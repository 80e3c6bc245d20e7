/// Example: serialize_tool convert .\data\*.bin -o .\out --from Binary --to Ascii
/// Example: serialize_tool peek .\data\record.bin --from Binary

use std::path::PathBuf;

use clap::{command, Parser, Subcommand};
use colored::Colorize;

use tbserialize::binutils::{get_final_output_folder, get_input_output_pairs, VERSION};
use tbserialize::iochannel::mode::ChannelMode;
use tbserialize::registry::TypeRegistry;
use tbserialize::utility::{FormatSpec, SerializeUtility};
use tbserialize::IoChannel;

#[derive(Parser)]
#[command(author = "Adakite", version = VERSION, about = "Inspect and convert polymorphic-serializer streams", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encodes every file matching INPUT from one wire format to another.
    Convert {
        #[arg(value_name = "INPUT")]
        input_glob: String,

        #[arg(short = 'o', long, value_name = "OUTPUT")]
        output_folder: Option<PathBuf>,

        /// Source wire format: Binary, Ascii, Xml, or Matlab.
        #[arg(long = "from", default_value = "Binary")]
        from_format: String,

        /// Destination wire format: Binary, Ascii, Xml, or Matlab.
        #[arg(long = "to", default_value = "Ascii")]
        to_format: String,

        /// Format option string passed to the source format (e.g. "LITTLE_ENDIAN").
        #[arg(long = "from-options", default_value = "")]
        from_options: String,

        /// Format option string passed to the destination format.
        #[arg(long = "to-options", default_value = "")]
        to_options: String,

        /// Only convert the first N elements of each file.
        #[arg(long)]
        max_elements: Option<usize>,
    },
    /// Autodetects and prints the next element's header without decoding
    /// its payload.
    Peek {
        #[arg(value_name = "INPUT")]
        input_path: PathBuf,

        #[arg(long = "from", default_value = "Binary")]
        from_format: String,

        #[arg(long = "from-options", default_value = "")]
        from_options: String,
    },
}

fn default_extension(format: &str) -> &'static str {
    match format {
        "Binary" => "bin",
        "Ascii" => "txt",
        "Xml" => "xml",
        "Matlab" => "m",
        _ => "dat",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Convert {
            input_glob,
            output_folder,
            from_format,
            to_format,
            from_options,
            to_options,
            max_elements,
        } => {
            let output_folder = get_final_output_folder(output_folder)?;
            let source_ext = default_extension(from_format);
            let dest_ext = default_extension(to_format);
            let pairs = get_input_output_pairs(input_glob, source_ext, &output_folder, dest_ext);

            let utility = match max_elements {
                Some(n) => SerializeUtility::new(TypeRegistry::new()).with_max_elements(*n),
                None => SerializeUtility::new(TypeRegistry::new()),
            };

            for (input_path, output_path) in pairs {
                print!("Converting {}... ", input_path.display());

                let mut input = IoChannel::new();
                input.open(&format!("File://{}", input_path.display()), ChannelMode::R_ONLY, None)?;

                let mut output = IoChannel::new();
                output.open(
                    &format!("File://{}", output_path.display()),
                    ChannelMode::W_ONLY | ChannelMode::CREATE | ChannelMode::TRUNCATE,
                    None,
                )?;

                let count = utility.convert_all(
                    &mut input,
                    FormatSpec::new(from_format, from_options),
                    &mut output,
                    FormatSpec::new(to_format, to_options),
                )?;

                println!("{} ({} elements)", "done!".green(), count);
            }

            println!("\nAll files successfully processed.");
        }
        Commands::Peek { input_path, from_format, from_options } => {
            let mut input = IoChannel::new();
            input.open(&format!("File://{}", input_path.display()), ChannelMode::R_ONLY, None)?;

            let utility = SerializeUtility::new(TypeRegistry::new());
            let header = utility.peek_next(&mut input, FormatSpec::new(from_format, from_options))?;

            println!("{}: {}", "type".bold(), header.type_name);
            println!("{}: {}", "name".bold(), header.name);
            println!("{}: {}", "options".bold(), header.options);
        }
    }

    Ok(())
}
