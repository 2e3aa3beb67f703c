use clap::{arg, crate_version, ArgAction, Command};
use log::error;
use rasterzss::{compress, decompress};

const RCH: &str = "unreachable was reached";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help = "Examples:
---------
Compress:   `rasterzss -c -w 256 -m -a -i image.raw -o image.rzs`
Decompress: `rasterzss -d -i image.rzs -o image.raw`";

    let main_cmd = Command::new("rasterzss")
        .about("Compress and decompress raw 8-bit grayscale rasters")
        .after_long_help(long_help)
        .version(crate_version!())
        .arg(arg!(-c --compress "compression mode").action(ArgAction::SetTrue))
        .arg(arg!(-d --decompress "decompression mode").action(ArgAction::SetTrue))
        .group(clap::ArgGroup::new("mode").args(["compress", "decompress"]).required(true))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(-w --width <N> "image width, required with -c").value_parser(clap::value_parser!(usize)))
        .arg(arg!(-m --model "enable the row-differential predictor").action(ArgAction::SetTrue))
        .arg(arg!(-a --adaptive "enable adaptive block scanning").action(ArgAction::SetTrue));

    let matches = main_cmd.get_matches();

    let path_in = matches.get_one::<String>("input").expect(RCH);
    let path_out = matches.get_one::<String>("output").expect(RCH);
    let model = matches.get_flag("model");
    let adaptive = matches.get_flag("adaptive");

    let dat = std::fs::read(path_in).map_err(|e| {
        error!("could not read input file {path_in}: {e}");
        e
    })?;

    if matches.get_flag("compress") {
        let width = match matches.get_one::<usize>("width") {
            Some(w) => *w,
            None => {
                error!("-w is required with -c");
                return Err("missing required -w".into());
            }
        };
        let compressed = compress(&dat, width, adaptive, model).map_err(|e| {
            error!("compression failed: {e}");
            e
        })?;
        std::fs::write(path_out, compressed)?;
    } else {
        let decompressed = decompress(&dat).map_err(|e| {
            error!("decompression failed: {e}");
            e
        })?;
        std::fs::write(path_out, decompressed)?;
    }

    Ok(())
}
