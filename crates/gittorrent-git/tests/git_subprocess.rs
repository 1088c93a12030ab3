//! Runs the real git binary. Each test returns early when git is missing.

use gittorrent_git::{Git, IndexPack, PackIngest, PackRequest};
use gittorrent_types::ObjectId;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::process::Command;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

fn run(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "gittorrent")
        .env("GIT_AUTHOR_EMAIL", "gittorrent@example.com")
        .env("GIT_COMMITTER_NAME", "gittorrent")
        .env("GIT_COMMITTER_EMAIL", "gittorrent@example.com")
        .output()
        .unwrap();
    assert!(output.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap()
}

fn commit(dir: &Path, file: &str, body: &str) -> ObjectId {
    std::fs::write(dir.join(file), body).unwrap();
    run(dir, &["add", file]);
    run(dir, &["commit", "-q", "-m", file]);
    run(dir, &["rev-parse", "HEAD"]).trim().parse().unwrap()
}

fn init(dir: &Path) {
    run(dir, &["init", "-q"]);
    run(dir, &["symbolic-ref", "HEAD", "refs/heads/master"]);
}

#[tokio::test]
async fn ls_remote_lists_head_and_branches() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    let head = commit(dir.path(), "a.txt", "a");

    let refs = Git::default().ls_remote(dir.path().to_str().unwrap()).await.unwrap();
    let names: Vec<_> = refs.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["HEAD", "refs/heads/master"]);
    assert!(refs.iter().all(|r| r.id == head));
}

#[tokio::test]
async fn ls_remote_of_missing_repository_fails() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(Git::default().ls_remote(missing.to_str().unwrap()).await.is_err());
}

#[tokio::test]
async fn generated_pack_indexes_into_empty_repository() {
    if !git_available() {
        return;
    }
    let source = tempfile::tempdir().unwrap();
    init(source.path());
    commit(source.path(), "a.txt", "first");
    let tip = commit(source.path(), "b.txt", "second");

    let work = tempfile::tempdir().unwrap();
    let pack = work.path().join(format!("{tip}.pack"));
    let size = Git::default()
        .generate_pack(PackRequest {
            repository: source.path().to_path_buf(),
            want: tip,
            have: None,
            output: pack.clone(),
        })
        .await
        .unwrap();
    assert!(size > 12);
    assert_eq!(&std::fs::read(&pack).unwrap()[..4], b"PACK");

    let target = tempfile::tempdir().unwrap();
    run(target.path(), &["init", "-q", "--bare"]);
    let outcome = IndexPack::new(Git::default())
        .in_dir(target.path())
        .ingest(&pack)
        .await
        .unwrap();
    assert!(outcome.success());
    run(target.path(), &["cat-file", "-e", &tip.to_hex()]);
}

#[tokio::test]
async fn thin_pack_with_have_is_smaller() {
    if !git_available() {
        return;
    }
    let source = tempfile::tempdir().unwrap();
    init(source.path());
    let base = commit(source.path(), "a.txt", &"line\n".repeat(500));
    let tip = commit(source.path(), "b.txt", "small");

    let work = tempfile::tempdir().unwrap();
    let git = Git::default();
    let full = git
        .generate_pack(PackRequest {
            repository: source.path().to_path_buf(),
            want: tip,
            have: None,
            output: work.path().join("full.pack"),
        })
        .await
        .unwrap();
    let thin = git
        .generate_pack(PackRequest {
            repository: source.path().to_path_buf(),
            want: tip,
            have: Some(base),
            output: work.path().join("thin.pack"),
        })
        .await
        .unwrap();
    assert!(thin < full);
}

#[tokio::test]
async fn garbage_pack_is_rejected_with_exit_code() {
    if !git_available() {
        return;
    }
    let target = tempfile::tempdir().unwrap();
    run(target.path(), &["init", "-q", "--bare"]);
    let pack = target.path().join("junk.pack");
    std::fs::write(&pack, b"not a pack at all").unwrap();

    let outcome = IndexPack::new(Git::default())
        .in_dir(target.path())
        .ingest(&pack)
        .await
        .unwrap();
    assert!(!outcome.success());
    assert!(outcome.code.is_some());
}
