use clap::{arg,crate_version,ArgMatches,Command};
use filecompressor::{codec,Method};
use std::path::Path;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

fn ok_to_overwrite(path_out: &str,force: bool) -> bool {
    if force || !Path::new(path_out).exists() {
        return true;
    }
    let mut ans = String::new();
    eprint!("{} exists, overwrite? (y/n) ",path_out);
    if std::io::stdin().read_line(&mut ans).is_err() {
        return false;
    }
    ans.trim_end()=="y" || ans.trim_end()=="Y"
}

fn file_command(name: &'static str,about: &'static str) -> Command {
    Command::new(name)
        .arg(arg!(-m --method <METHOD> "compression algorithm").value_parser(Method::NAMES)
            .required(true))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(-f --force "overwrite output without asking"))
        .about(about)
}

/// Returns (method,input,output), or None if the user declined to overwrite
fn get_paths(cmd: &ArgMatches) -> Result<Option<(Method,String,String)>,Box<dyn std::error::Error>> {
    let path_in = cmd.get_one::<String>("input").expect(RCH);
    let path_out = cmd.get_one::<String>("output").expect(RCH);
    let method: Method = cmd.get_one::<String>("method").expect(RCH).parse()?;
    if !ok_to_overwrite(path_out,cmd.get_flag("force")) {
        return Ok(None);
    }
    Ok(Some((method,path_in.to_string(),path_out.to_string())))
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress:      `filecompressor compress -m huffman -i my_expanded -o my_compressed`
Expand:        `filecompressor expand -m huffman -i my_compressed -o my_expanded`";

    let mut main_cmd = Command::new("filecompressor")
        .about("Compress and expand files with Huffman or LZW coding")
        .after_long_help(long_help)
        .subcommand_required(true)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(file_command("compress","compress a file"));
    main_cmd = main_cmd.subcommand(file_command("expand","expand a file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let (method,path_in,path_out) = match get_paths(cmd)? {
            Some(p) => p,
            None => {
                eprintln!("abort operation");
                return Ok(());
            }
        };
        let stats = codec::compress_file(method,Path::new(&path_in),Path::new(&path_out))?;
        eprintln!("compressed {} into {} ({:.1}% saved, {:.3}s)",stats.in_size,stats.out_size,
            100.0*stats.ratio(),stats.elapsed.as_secs_f64());
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let (method,path_in,path_out) = match get_paths(cmd)? {
            Some(p) => p,
            None => {
                eprintln!("abort operation");
                return Ok(());
            }
        };
        let stats = codec::expand_file(method,Path::new(&path_in),Path::new(&path_out))?;
        eprintln!("expanded {} into {} ({:.3}s)",stats.in_size,stats.out_size,stats.elapsed.as_secs_f64());
    }

    Ok(())
}
