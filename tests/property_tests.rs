//! Property-Based Tests for archsetup
//!
//! These tests verify:
//! - Validator grammars against independent reference predicates
//! - Partition naming for both disk conventions
//! - Single-quote escaping survives a real POSIX shell unchanged

use proptest::prelude::*;
use std::process::Command;

use archsetup::engine::DiskSelection;
use archsetup::shell::{MAX_ENCODED_LEN, escape_single_quoted, escape_single_quoted_bounded};
use archsetup::validation::{
    DiskName, is_valid_disk_name, is_valid_gpu_choice, is_valid_hostname, is_valid_timezone,
    is_valid_username,
};

// =============================================================================
// Validator Property Tests
// =============================================================================

fn username_char() -> impl Strategy<Value = char> {
    prop_oneof![
        proptest::char::range('a', 'z'),
        proptest::char::range('A', 'Z'),
        proptest::char::range('0', '9'),
        Just('-'),
        Just('_'),
    ]
}

proptest! {
    /// Username: accepted iff 1-32 chars, all alphanumeric / '-' / '_'
    #[test]
    fn username_matches_reference(s in "\\PC{0,40}") {
        let reference = (1..=32).contains(&s.len())
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        prop_assert_eq!(is_valid_username(&s), reference);
    }

    /// Username: any string built from the legal alphabet within bounds passes
    #[test]
    fn username_legal_alphabet_accepted(chars in proptest::collection::vec(username_char(), 1..=32)) {
        let s: String = chars.into_iter().collect();
        prop_assert!(is_valid_username(&s));
    }

    /// Hostname: a label ending in '-' is never accepted
    #[test]
    fn hostname_rejects_trailing_hyphen_label(
        head in "[a-z0-9]{1,10}",
        tail in "[a-z0-9]{1,10}",
    ) {
        let in_first = format!("{}-.{}", head, tail);
        let in_last = format!("{}.{}-", head, tail);
        prop_assert!(!is_valid_hostname(&in_first));
        prop_assert!(!is_valid_hostname(&in_last));
    }

    /// Hostname: empty labels and labels over 63 chars are rejected
    #[test]
    fn hostname_rejects_bad_label_length(label in "[a-z]{64,80}") {
        let too_long = format!("{}.com", label);
        let empty_label = format!("a..{}", &label[..3]);
        prop_assert!(!is_valid_hostname(&too_long));
        prop_assert!(!is_valid_hostname(&empty_label));
    }

    /// Hostname: well-formed dotted names pass
    #[test]
    fn hostname_accepts_wellformed(labels in proptest::collection::vec("[a-z0-9]([a-z0-9-]{0,20}[a-z0-9])?", 1..5)) {
        let s = labels.join(".");
        prop_assert!(is_valid_hostname(&s));
    }

    /// Timezone: accepted iff 1-128 legal chars containing a '/'
    #[test]
    fn timezone_matches_reference(s in "[A-Za-z0-9_/+. -]{0,140}") {
        let reference = (1..=128).contains(&s.len())
            && s.contains('/')
            && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '-'));
        prop_assert_eq!(is_valid_timezone(&s), reference);
    }

    /// GPU choice: any single char outside '0'..='4' is rejected
    #[test]
    fn gpu_choice_single_char(c in any::<char>()) {
        let s = c.to_string();
        prop_assert_eq!(is_valid_gpu_choice(&s), ('0'..='4').contains(&c));
    }

    /// Disk names: both grammars accepted, anything appended rejected
    #[test]
    fn disk_name_grammars(letter in "[a-z]", ctrl in "[0-9]{1,3}", ns in "[0-9]{1,3}", junk in "[a-z0-9p]{1,3}") {
        let short = format!("sd{}", letter);
        let nvme = format!("nvme{}n{}", ctrl, ns);
        prop_assert!(is_valid_disk_name(&short));
        prop_assert!(is_valid_disk_name(&nvme));
        let short_junk = format!("{}{}", short, junk);
        let nvme_junk = format!("{}p{}", nvme, junk);
        prop_assert!(!is_valid_disk_name(&short_junk));
        prop_assert!(!is_valid_disk_name(&nvme_junk));
    }
}

// =============================================================================
// Partition Naming Property Tests
// =============================================================================

proptest! {
    /// sdX disks get bare numeric suffixes
    #[test]
    fn short_disk_partition_suffixes(letter in "[a-z]") {
        let name = format!("sd{}", letter);
        let disk = DiskSelection::new(DiskName::parse(name.clone()).expect("valid"));
        let (efi, swap, root) = disk.partitions();
        prop_assert_eq!(efi, format!("/dev/{}1", name));
        prop_assert_eq!(swap, format!("/dev/{}2", name));
        prop_assert_eq!(root, format!("/dev/{}3", name));
    }

    /// nvme disks get a 'p' before the partition number
    #[test]
    fn nvme_partition_suffixes(ctrl in 0u32..100, ns in 1u32..100) {
        let name = format!("nvme{}n{}", ctrl, ns);
        let disk = DiskSelection::new(DiskName::parse(name.clone()).expect("valid"));
        let (efi, swap, root) = disk.partitions();
        prop_assert_eq!(efi, format!("/dev/{}p1", name));
        prop_assert_eq!(swap, format!("/dev/{}p2", name));
        prop_assert_eq!(root, format!("/dev/{}p3", name));
    }
}

// =============================================================================
// Shell Escaping Property Tests
// =============================================================================

/// Evaluate `'<encoded>'` in /bin/sh and return what printf sees.
fn shell_roundtrip(input: &str) -> String {
    let script = format!("printf %s '{}'", escape_single_quoted(input));
    let output = Command::new("sh")
        .arg("-c")
        .arg(script)
        .output()
        .expect("sh should run");
    assert!(output.status.success());
    String::from_utf8(output.stdout).expect("utf8")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A POSIX shell reproduces the exact input from the quoted encoding
    #[test]
    fn escape_survives_shell(s in "[ -~\n\t\u{e9}\u{4e2d}]{0,40}") {
        prop_assert_eq!(shell_roundtrip(&s), s);
    }

    /// Escaping only grows the input by 3 bytes per apostrophe
    #[test]
    fn escape_length(s in "\\PC{0,64}") {
        let quotes = s.matches('\'').count();
        prop_assert_eq!(escape_single_quoted(&s).len(), s.len() + 3 * quotes);
    }

    /// The bounded encoder either returns the full encoding or an error, never a prefix
    #[test]
    fn bounded_never_clips(s in "['a]{0,400}") {
        let full = escape_single_quoted(&s);
        match escape_single_quoted_bounded(&s, MAX_ENCODED_LEN) {
            Ok(encoded) => prop_assert_eq!(encoded, full),
            Err(_) => prop_assert!(full.len() > MAX_ENCODED_LEN),
        }
    }
}

#[test]
fn escape_apostrophe_example() {
    assert_eq!(escape_single_quoted("it's"), r"it'\''s");
    assert_eq!(shell_roundtrip("it's"), "it's");
    assert_eq!(shell_roundtrip("a'; rm -rf / #"), "a'; rm -rf / #");
}
