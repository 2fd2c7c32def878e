use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::Path;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const SAM: &str = "I am Sam. Sam I am. I do not like this Sam I am.\n";

fn run(subcommand: &str,method: &str,in_path: &Path,out_path: &Path) -> Result<Command,Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("filecompressor")?;
    cmd.arg(subcommand)
        .arg("-m").arg(method)
        .arg("-i").arg(in_path)
        .arg("-o").arg(out_path)
        .arg("-f");
    Ok(cmd)
}

fn round_trip_test(method: &str,dat: &[u8]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("orig");
    let cmp_path = temp_dir.path().join("compressed");
    let out_path = temp_dir.path().join("restored");
    std::fs::write(&in_path,dat)?;
    run("compress",method,&in_path,&cmp_path)?
        .assert()
        .success()
        .stderr(predicate::str::contains(format!("compressed {} into",dat.len())));
    run("expand",method,&cmp_path,&out_path)?
        .assert()
        .success()
        .stderr(predicate::str::contains(format!("into {}",dat.len())));
    assert_eq!(std::fs::read(out_path)?,dat.to_vec());
    Ok(())
}

#[test]
fn huffman_round_trip() -> STDRESULT {
    round_trip_test("huffman",SAM.repeat(40).as_bytes())?;
    round_trip_test("huffman","aaaa".as_bytes())?;
    round_trip_test("huffman",&[])
}

#[test]
fn lzw_round_trip() -> STDRESULT {
    round_trip_test("lzw",SAM.repeat(40).as_bytes())?;
    round_trip_test("lzw","ababab".as_bytes())?;
    round_trip_test("lzw",&[])
}

#[test]
fn lzw_output_matches_reference() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("abab.txt");
    let out_path = temp_dir.path().join("abab.lzw");
    std::fs::write(&in_path,"abab")?;
    run("compress","lzw",&in_path,&out_path)?
        .assert()
        .success();
    assert_eq!(std::fs::read(out_path)?,vec![97,0,0,0,98,0,0,0,0,1,0,0]);
    Ok(())
}

#[test]
fn unknown_method_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("orig");
    std::fs::write(&in_path,SAM)?;
    run("compress","lzss",&in_path,&temp_dir.path().join("out"))?
        .assert()
        .failure();
    Ok(())
}

#[test]
fn missing_input_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let out_path = temp_dir.path().join("out");
    run("compress","huffman",&temp_dir.path().join("missing"),&out_path)?
        .assert()
        .failure()
        .stderr(predicate::str::contains("IoOpen"));
    assert!(!out_path.exists());
    Ok(())
}

#[test]
fn corrupt_input_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("corrupt.huff");
    let out_path = temp_dir.path().join("out");
    std::fs::write(&in_path,[1u8,0])?;
    run("expand","huffman",&in_path,&out_path)?
        .assert()
        .failure()
        .stderr(predicate::str::contains("CorruptHeader"));
    assert!(!out_path.exists());
    Ok(())
}
