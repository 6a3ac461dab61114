//! Publisher tests against real git repositories and a local bare remote.

use autofix::core::types::RepoInfo;
use autofix::io::config::GitHubConfig;
use autofix::publish::{GitPublisher, Publisher};
use autofix::test_support::{FixtureRepo, run_git};

fn publisher() -> GitPublisher {
    GitPublisher::from_config(&GitHubConfig::default()).expect("publisher")
}

#[test]
fn branch_commit_push_round_trip() {
    let repo = FixtureRepo::calculator_with_remote();
    let remote = repo.remote_path().expect("remote");
    let publisher = publisher();

    let branch = publisher.create_branch(repo.path()).expect("branch");
    assert!(branch.starts_with("fix/"));
    assert_eq!(repo.git(&["rev-parse", "--abbrev-ref", "HEAD"]), branch);

    repo.write("src/calculator.js", "module.exports = {};\n");
    publisher
        .commit(repo.path(), "Replace calculator")
        .expect("commit");
    assert_eq!(repo.git(&["log", "-1", "--format=%s"]), "Replace calculator");
    assert_eq!(repo.git(&["status", "--porcelain"]), "");

    publisher.push(repo.path(), &branch).expect("push");
    assert_eq!(
        run_git(remote, &["rev-parse", &branch]),
        repo.git(&["rev-parse", "HEAD"])
    );
    assert_eq!(
        repo.git(&["rev-parse", "--abbrev-ref", "@{upstream}"]),
        format!("origin/{branch}")
    );
}

#[test]
fn commit_with_nothing_staged_is_an_error() {
    let repo = FixtureRepo::calculator_with_remote();
    let err = publisher()
        .commit(repo.path(), "empty")
        .expect_err("nothing to commit");
    assert!(err.to_string().contains("nothing to commit"));
}

#[test]
fn repo_info_reads_fetch_url() {
    let repo = FixtureRepo::calculator_with_remote();
    let info = publisher().repo_info(repo.path()).expect("repo info");
    assert_eq!(
        info,
        RepoInfo {
            owner: "acme".to_string(),
            name: "calculator".to_string(),
        }
    );
}

#[test]
fn repo_info_accepts_scp_style_remote() {
    let repo = FixtureRepo::calculator_with_remote();
    repo.git(&["remote", "set-url", "origin", "git@github.com:acme/calc-tools.git"]);
    let info = publisher().repo_info(repo.path()).expect("repo info");
    assert_eq!(info.owner, "acme");
    assert_eq!(info.name, "calc-tools");
}

#[test]
fn repo_info_rejects_unrecognized_remote() {
    let repo = FixtureRepo::calculator_with_remote();
    repo.git(&["remote", "set-url", "origin", "/srv/git/calculator"]);
    let err = publisher().repo_info(repo.path()).expect_err("unparseable");
    assert!(format!("{err:#}").contains("unrecognized remote url"));
}

#[test]
fn missing_remote_is_an_error() {
    let repo = FixtureRepo::calculator();
    repo.git(&["init", "-q"]);
    let err = publisher().repo_info(repo.path()).expect_err("no origin");
    assert!(format!("{err:#}").contains("read url of remote origin"));
}
