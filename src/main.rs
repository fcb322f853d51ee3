use clap::{arg,crate_version,value_parser,Command};
use lzw13::lzw;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

fn ok_to_overwrite(path_out: &str) -> bool {
    if let Ok(_f) = std::fs::File::open(path_out) {
        let mut ans = String::new();
        eprint!("{} exists, overwrite? (y/n) ",path_out);
        std::io::stdin().read_line(&mut ans).expect("could not read stdin");
        if ans.trim_end()=="y" || ans.trim_end()=="Y" {
            log::warn!("existing file will be replaced");
            return true;
        }
        return false;
    }
    true
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress:      `lzw13 compress -i my_expanded -o my_compressed`
Expand:        `lzw13 expand -i my_compressed -o my_expanded -m 4096`

Inputs to `compress` are limited to 8192 bytes, and must actually shrink.";

    let mut main_cmd = Command::new("lzw13")
        .about("Compress and expand small buffers with 13 bit LZW")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("compress a file"));

    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(-m --"max-size" <BYTES> "largest allowed output").value_parser(value_parser!(usize))
            .required(false).default_value("8192"))
        .about("expand a file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        if !ok_to_overwrite(path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let mut in_file = std::fs::File::open(path_in)?;
        // compress into memory first, the output file is not touched if this fails
        let mut compressed = std::io::Cursor::new(Vec::new());
        let (in_size,out_size) = match lzw::compress(&mut in_file,&mut compressed,&lzw13::STD_OPTIONS) {
            Ok(sizes) => sizes,
            Err(e) => {
                eprintln!("{} not compressed: {}",path_in,e);
                return Err(e);
            }
        };
        std::fs::write(path_out,compressed.into_inner())?;
        eprintln!("compressed {} into {}",in_size,out_size);
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let max_size = cmd.get_one::<usize>("max-size").expect(RCH);
        if !ok_to_overwrite(path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let mut opt = lzw13::STD_OPTIONS;
        opt.max_output_size = *max_size;
        let mut in_file = std::fs::File::open(path_in)?;
        let mut expanded = std::io::Cursor::new(Vec::new());
        let (in_size,out_size) = match lzw::expand(&mut in_file,&mut expanded,&opt) {
            Ok(sizes) => sizes,
            Err(e) => {
                eprintln!("{} not expanded: {}",path_in,e);
                return Err(e);
            }
        };
        std::fs::write(path_out,expanded.into_inner())?;
        eprintln!("expanded {} into {}",in_size,out_size);
    }

    Ok(())
}
