//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

mod common;

#[cfg(test)]
mod passing {
    use crate::common::{ctx, manager, selector};

    #[test]
    fn script_gets_asset_path() {
        let manager = manager();
        assert_eq!(
            manager.rewrite_value(
                "/core/modules/system/test.js",
                &ctx("/"),
                Some(&[selector("script")])
            ),
            "/test-assets/core/modules/system/test.js"
        );
    }

    #[test]
    fn link_gets_active_site_prefix() {
        let manager = manager();
        let ctx = ctx("/fi/prefix-fi/page");
        let links = [selector("a")];

        let once = manager.rewrite_value("/link", &ctx, Some(&links)).into_owned();
        assert_eq!(once, "/fi/prefix-fi/link");
        assert_eq!(manager.rewrite_value(&once, &ctx, Some(&links)), once);
    }

    #[test]
    fn first_matching_prefix_wins() {
        let manager = manager();
        assert_eq!(
            manager.rewrite_value("/x", &ctx("/sv/prefix-sv/prefix-fi"), Some(&[selector("a")])),
            "/sv/prefix-sv/x"
        );
    }

    #[test]
    fn cdn_value_is_kept() {
        let manager = manager();
        let value = "https://kymp.blob.core.windows.net/test/img.png?itok=1";
        for selector in manager.selectors().iter() {
            assert_eq!(
                manager.rewrite_value(value, &ctx("/fi/prefix-fi/"), Some(&[selector.clone()])),
                value
            );
        }
    }

    #[test]
    fn og_image_becomes_absolute() {
        let manager = manager();
        assert_eq!(
            manager.rewrite_value(
                "https://example.test/themes/hdbt/og.png",
                &ctx("/"),
                Some(&[selector("og:image")])
            ),
            "http://example.test/test-assets/themes/hdbt/og.png"
        );
        assert_eq!(
            manager.rewrite_value(
                "/themes/hdbt/og.png",
                &ctx("/"),
                Some(&[selector("twitter:image")])
            ),
            "http://example.test/test-assets/themes/hdbt/og.png"
        );
    }

    #[test]
    fn srcset_entries_rewritten_one_by_one() {
        let manager = manager();
        assert_eq!(
            manager.rewrite_value(
                "/a/img.png 1x, //foreign.example/b/img.png 2x",
                &ctx("/"),
                Some(&[selector("source")])
            ),
            "/test-assets/a/img.png 1x, //foreign.example/b/img.png 2x"
        );
    }

    #[test]
    fn no_selectors_means_asset_path() {
        let manager = manager();
        assert_eq!(
            manager.rewrite_value("core/misc/a.js", &ctx("/"), None),
            "/test-assets/core/misc/a.js"
        );
        assert_eq!(
            manager.rewrite_value("/core/misc/a.js", &ctx("/"), Some(&[])),
            "/test-assets/core/misc/a.js"
        );
    }

    #[test]
    fn selectors_do_not_see_each_others_output() {
        let manager = manager();
        let ctx = ctx("/fi/prefix-fi/page");

        assert_eq!(
            manager.rewrite_value("/link", &ctx, Some(&[selector("a"), selector("script")])),
            "/fi/prefix-fi/link"
        );
        assert_eq!(
            manager.rewrite_value("/link", &ctx, Some(&[selector("script"), selector("a")])),
            "/test-assets/link"
        );
        assert_eq!(
            manager.rewrite_value("/core/a.js", &ctx, Some(manager.selectors().selectors())),
            "/test-assets/core/a.js"
        );
    }

    #[test]
    fn strip_asset_path_reverts_add_asset_path() {
        let manager = manager();
        let resolver = manager.resolver();
        let added = resolver.add_asset_path("/core/misc/a.js").into_owned();
        assert_eq!(added, "/test-assets/core/misc/a.js");
        assert_eq!(resolver.strip_asset_path(&added), "/core/misc/a.js");
        assert_eq!(resolver.strip_asset_path("/test-assets"), "/");
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
    use std::borrow::Cow;

    use crate::common::{ctx, manager, selector};

    #[test]
    fn empty_value_is_kept() {
        let manager = manager();
        for selector in manager.selectors().iter() {
            assert_eq!(
                manager.rewrite_value("", &ctx("/fi/prefix-fi/"), Some(&[selector.clone()])),
                ""
            );
        }
    }

    #[test]
    fn foreign_absolute_value_is_kept() {
        let manager = manager();
        for value in ["https://elsewhere.test/a.js", "//elsewhere.test/a.js"] {
            assert_eq!(
                manager.rewrite_value(value, &ctx("/"), Some(&[selector("script")])),
                value
            );
            assert_eq!(
                manager.rewrite_value(value, &ctx("/"), Some(&[selector("og:image")])),
                value
            );
        }
    }

    #[test]
    fn link_without_active_prefix_is_kept() {
        let manager = manager();
        assert!(matches!(
            manager.rewrite_value("/link", &ctx("/node/1"), Some(&[selector("a")])),
            Cow::Borrowed("/link")
        ));
    }

    #[test]
    fn relative_link_is_kept() {
        let manager = manager();
        for value in ["#main-content", "page", "mailto:someone@example.test"] {
            assert_eq!(
                manager.rewrite_value(value, &ctx("/fi/prefix-fi/"), Some(&[selector("a")])),
                value
            );
        }
    }

    #[test]
    fn value_outside_asset_path_is_not_stripped() {
        let manager = manager();
        assert_eq!(
            manager.resolver().strip_asset_path("/test-assets-other/a.js"),
            "/test-assets-other/a.js"
        );
    }
}
