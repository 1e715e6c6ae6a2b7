//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use assert_cmd::prelude::*;
    use std::process::Command;

    const CONFIG: &str = "tests/fixtures/siteproxy.toml";

    #[test]
    fn rewrite_single_value() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd
            .args(["-c", CONFIG, "--value", "/core/a.js", "--selector", "script"])
            .output()
            .unwrap();

        assert_eq!(String::from_utf8_lossy(&out.stdout), "/test-assets/core/a.js\n");
        assert_eq!(out.status.code(), Some(0));
    }

    #[test]
    fn rewrite_link_for_request_path() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd
            .args(["-c", CONFIG, "--path", "/fi/prefix-fi/page"])
            .args(["--value", "/link", "-s", "a"])
            .output()
            .unwrap();

        assert_eq!(String::from_utf8_lossy(&out.stdout), "/fi/prefix-fi/link\n");
        assert_eq!(out.status.code(), Some(0));
    }

    #[test]
    fn repeated_selectors_do_not_stack() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd
            .args(["-c", CONFIG, "--path", "/fi/prefix-fi/page", "--value", "/link"])
            .args(["-s", "a", "-s", "script", "-s", "img"])
            .output()
            .unwrap();

        assert_eq!(String::from_utf8_lossy(&out.stdout), "/fi/prefix-fi/link\n");
        assert_eq!(out.status.code(), Some(0));
    }

    #[test]
    fn rewrite_html_from_stdin() {
        let mut cmd = assert_cmd::Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd
            .args(["-c", CONFIG, "-t", "html"])
            .write_stdin(r#"<img src="/a.png">"#)
            .output()
            .unwrap();

        assert_eq!(
            String::from_utf8_lossy(&out.stdout),
            r#"<img src="/test-assets/a.png">"#
        );
        assert_eq!(out.status.code(), Some(0));
    }

    #[test]
    fn rewrite_html_file() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd
            .args(["-c", CONFIG, "--host", "example.test", "tests/fixtures/page.html"])
            .output()
            .unwrap();
        let stdout = String::from_utf8_lossy(&out.stdout);

        assert!(stdout.contains(r#"href="/test-assets/themes/hdbt/style.css""#));
        assert!(stdout.contains(
            r#"content="http://example.test/test-assets/themes/hdbt/og.png""#
        ));
        assert_eq!(out.status.code(), Some(0));
    }

    #[test]
    fn rewrite_css_file() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd
            .args(["-c", CONFIG, "--base-path", "themes/hdbt/css"])
            .arg("tests/fixtures/style.css")
            .output()
            .unwrap();

        assert!(String::from_utf8_lossy(&out.stdout)
            .contains("url(/test-assets/themes/hdbt/images/hero.jpg)"));
        assert_eq!(out.status.code(), Some(0));
    }

    #[test]
    fn list_selectors() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd.args(["-c", CONFIG, "--list-selectors"]).output().unwrap();
        let stdout = String::from_utf8_lossy(&out.stdout);

        assert!(stdout.contains("a\ta\thref\tsite-prefix\n"));
        assert!(stdout.contains("source\tsource\tsrcset\tmulti-value \", \"\n"));
        assert!(stdout.contains("og:image\tmeta[property=og:image]\tcontent\talways-absolute\n"));
        assert_eq!(out.status.code(), Some(0));
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use assert_cmd::prelude::*;
    use std::process::Command;

    const CONFIG: &str = "tests/fixtures/siteproxy.toml";

    #[test]
    fn unknown_selector() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd
            .args(["-c", CONFIG, "--value", "/a.js", "--selector", "nope"])
            .output()
            .unwrap();

        assert!(String::from_utf8_lossy(&out.stderr).contains("unknown selector 'nope'"));
        assert_eq!(String::from_utf8_lossy(&out.stdout), "");
        assert_eq!(out.status.code(), Some(1));
    }

    #[test]
    fn invalid_config() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd
            .args(["-c", "tests/fixtures/invalid-selector.toml", "--value", "/a.js"])
            .output()
            .unwrap();

        assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid selector"));
        assert_eq!(out.status.code(), Some(1));
    }

    #[test]
    fn missing_input_file() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd
            .args(["-c", CONFIG, "tests/fixtures/missing.html"])
            .output()
            .unwrap();

        assert!(String::from_utf8_lossy(&out.stderr).contains("IO error"));
        assert_eq!(out.status.code(), Some(1));
    }

    #[test]
    fn selector_requires_value() {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        let out = cmd.args(["--selector", "a"]).output().unwrap();

        assert_eq!(out.status.code(), Some(2));
    }
}
