use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn sam_text(len: usize) -> Vec<u8> {
    "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes().iter().cycle().take(len).copied().collect()
}

// Write test data into the temporary directory
fn stage(temp_dir: &tempfile::TempDir,name: &str,dat: &[u8]) -> Result<PathBuf,Box<dyn std::error::Error>> {
    let path = temp_dir.path().join(name);
    std::fs::write(&path,dat)?;
    Ok(path)
}

#[test]
fn compress_reference() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = stage(&temp_dir,"tobe.txt","TOBEORNOTTOBEORTOBEORNOT".as_bytes())?;
    let out_path = temp_dir.path().join("tobe.lzw");
    Command::cargo_bin("lzw13")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("compressed 24 into 20"));
    let expected = hex::decode("2A13C8445279489C4F2A40A090685C160F098000")?;
    assert_eq!(std::fs::read(out_path)?,expected);
    Ok(())
}

#[test]
fn round_trip() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let original = sam_text(5000);
    let in_path = stage(&temp_dir,"sam.txt",&original)?;
    let cmp_path = temp_dir.path().join("sam.lzw");
    let out_path = temp_dir.path().join("sam_expanded.txt");
    Command::cargo_bin("lzw13")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&cmp_path)
        .assert()
        .success();
    assert!(std::fs::read(&cmp_path)?.len() < original.len());
    Command::cargo_bin("lzw13")?
        .arg("expand")
        .arg("-i").arg(&cmp_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("into 5000"));
    assert_eq!(std::fs::read(out_path)?,original);
    Ok(())
}

#[test]
fn incompressible_input() -> STDRESULT {
    // 64 distinct bytes, every one is its own code
    let temp_dir = tempfile::tempdir()?;
    let dat: Vec<u8> = (0..64).collect();
    let in_path = stage(&temp_dir,"distinct.bin",&dat)?;
    let out_path = temp_dir.path().join("distinct.lzw");
    Command::cargo_bin("lzw13")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not smaller"));
    assert!(!out_path.exists());
    Ok(())
}

#[test]
fn oversized_input() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = stage(&temp_dir,"big.txt",&sam_text(8193))?;
    let out_path = temp_dir.path().join("big.lzw");
    Command::cargo_bin("lzw13")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds 8192"));
    assert!(!out_path.exists());
    Ok(())
}

#[test]
fn expansion_limit() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = stage(&temp_dir,"sam.txt",&sam_text(2000))?;
    let cmp_path = temp_dir.path().join("sam.lzw");
    let out_path = temp_dir.path().join("sam_expanded.txt");
    Command::cargo_bin("lzw13")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&cmp_path)
        .assert()
        .success();
    Command::cargo_bin("lzw13")?
        .arg("expand")
        .arg("-m").arg("1999")
        .arg("-i").arg(&cmp_path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("buffer exhausted"));
    assert!(!out_path.exists());
    Command::cargo_bin("lzw13")?
        .arg("expand")
        .arg("-m").arg("2000")
        .arg("-i").arg(&cmp_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();
    assert_eq!(std::fs::read(out_path)?,sam_text(2000));
    Ok(())
}
