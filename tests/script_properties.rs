//! Properties of the remote command templates.

use proptest::prelude::*;
use release_deploy::remote::script;
use release_deploy::types::{ArtifactKind, ArtifactRef, RemoteWorkspace};

proptest! {
    #[test]
    fn quoted_values_split_back_to_one_word(value in "[^\\x00]{0,64}") {
        let quoted = script::quote(&value);
        prop_assert_eq!(shell_words::split(&quoted).unwrap(), vec![value.clone()]);
    }

    #[test]
    fn wrapped_scripts_are_a_single_sh_argument(body in "[^\\x00]{1,64}") {
        let wrapped = script::wrap_sh(&body);
        let words = shell_words::split(&wrapped).unwrap();
        prop_assert_eq!(words, vec!["sh".to_string(), "-c".to_string(), body.clone()]);
    }

    #[test]
    fn multi_line_remote_paths_are_rejected(
        head in "/[a-z]{1,8}",
        tail in "[a-z;& ]{0,8}",
    ) {
        let path = format!("{head}\n{tail}");
        prop_assert!(script::validate_remote_path(&path).is_err());
    }

    #[test]
    fn workspace_paths_only_appear_quoted(home in "/[a-z ;$`'\"]{1,24}") {
        let ws = RemoteWorkspace::new(home.clone(), "/usr/local/bin");
        let prepared = script::prepare_workspace(&ws);
        let expected = format!("HOME_DIR={}", script::quote(&home));
        prop_assert!(prepared.contains(&expected));
    }

    #[test]
    fn archive_stem_drops_only_the_suffix(
        name in "[a-z][a-z0-9-]{0,15}",
        suffix in prop::sample::select(vec![".tar.gz", ".tgz", ".tar.xz", ".tar.bz2", ".tar", ".zip"]),
    ) {
        let artifact = ArtifactRef::new(format!("/downloads/{name}{suffix}"));
        prop_assert_eq!(artifact.stem(), name);
        prop_assert!(matches!(artifact.kind(), ArtifactKind::Archive(_)));
    }
}
