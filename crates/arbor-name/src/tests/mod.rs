//! Unit tests for the arbor-name crate.


mod parse_tests {
    use rstest::rstest;

    use crate::{Name, NameError};

    #[rstest]
    #[case("cn=Alice,ou=People", "cn=alice,ou=people")]
    #[case("CN = Alice , OU = People", "cn=alice,ou=people")]
    #[case("cn=  Many   Spaces ,dc=example", "cn=many spaces,dc=example")]
    #[case("uid=b+cn=a,dc=example", "cn=a+uid=b,dc=example")]
    #[case("cn=a;dc=example", "cn=a,dc=example")]
    #[case("2.5.4.3=x,dc=example", "2.5.4.3=x,dc=example")]
    fn parses_and_normalizes(#[case] input: &str, #[case] expected: &str) {
        let name = Name::parse(input).expect("name should parse");
        assert_eq!(name.normalized(), expected);
    }

    #[rstest]
    #[case("cn=Smith\\, John,ou=people", "Smith, John")]
    #[case("cn=\"Smith, John\",ou=people", "Smith, John")]
    #[case("cn=caf\\C3\\A9,ou=people", "café")]
    #[case("cn=trailing\\ ,ou=people", "trailing ")]
    fn unescapes_values(#[case] input: &str, #[case] expected: &str) {
        let name = Name::parse(input).expect("name should parse");
        assert_eq!(name.rdn().map(|rdn| rdn.value()), Some(expected));
        assert_eq!(name.len(), 2);
    }

    #[rstest]
    #[case("cn=a,,ou=b")]
    #[case("cn=a,")]
    fn rejects_empty_components(#[case] input: &str) {
        let error = Name::parse(input).expect_err("should fail");
        assert!(matches!(error, NameError::EmptyComponent { .. }));
    }

    #[test]
    fn rejects_missing_separator() {
        let error = Name::parse("cn,ou=b").expect_err("should fail");
        assert!(matches!(error, NameError::MissingSeparator { .. }));
    }

    #[rstest]
    #[case("=value")]
    #[case("c_n=value")]
    #[case("1..2=value")]
    fn rejects_bad_attribute_types(#[case] input: &str) {
        let error = Name::parse(input).expect_err("should fail");
        assert!(matches!(error, NameError::InvalidAttributeType { .. }));
    }

    #[rstest]
    #[case("cn=bad\\")]
    #[case("cn=bad\\G1")]
    fn rejects_broken_escapes(#[case] input: &str) {
        let error = Name::parse(input).expect_err("should fail");
        assert!(matches!(error, NameError::InvalidEscape { .. }));
    }

    #[test]
    fn rejects_unterminated_quote() {
        let error = Name::parse("cn=\"open,ou=b").expect_err("should fail");
        assert!(matches!(error, NameError::UnterminatedQuote { .. }));
    }

    #[test]
    fn empty_text_is_root() {
        let name = Name::parse("   ").expect("root parses");
        assert!(name.is_empty());
        assert!(name.parent().is_none());
        assert_eq!(name, Name::root());
    }

    #[test]
    fn user_form_is_preserved() {
        let name = Name::parse("CN=Test User, OU=System").expect("parse");
        assert_eq!(name.user_provided(), "CN=Test User,OU=System");
        assert_eq!(name.to_string(), "CN=Test User,OU=System");
    }

    #[test]
    fn serde_uses_user_form() {
        let name = Name::parse("CN=Test,OU=System").expect("parse");
        let json = serde_json::to_string(&name).expect("serialize");
        assert_eq!(json, "\"CN=Test,OU=System\"");
        let back: Name = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, name);
        assert_eq!(back.user_provided(), "CN=Test,OU=System");
    }

    fn canonical(attr_type: &str) -> String {
        match attr_type.to_ascii_lowercase().as_str() {
            "commonname" => "cn".to_owned(),
            "organizationalunitname" => "ou".to_owned(),
            other => other.to_owned(),
        }
    }

    #[test]
    fn canonical_types_leave_the_user_form_alone() {
        let name = Name::parse("commonName=Bob+uid=b,organizationalUnitName=People")
            .expect("parse")
            .with_canonical_types(&canonical);
        assert_eq!(
            name.user_provided(),
            "commonName=Bob+uid=b,organizationalUnitName=People"
        );
        assert_eq!(name.normalized(), "cn=bob+uid=b,ou=people");
        assert_eq!(name, Name::parse("cn=BOB+uid=b,ou=people").expect("parse"));
        assert_eq!(name.rdn().map(|rdn| rdn.attr_type()), Some("commonName"));
    }

    #[test]
    fn serde_keeps_canonical_types() {
        let name = Name::parse("commonName=Bob,ou=People")
            .expect("parse")
            .with_canonical_types(&canonical);
        let json = serde_json::to_string(&name).expect("serialize");
        let back: Name = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.normalized(), "cn=bob,ou=people");
        assert_eq!(back.user_provided(), "commonName=Bob,ou=People");
    }

    #[test]
    fn serde_rejects_types_that_do_not_fit() {
        let json = r#"{"name":"cn=Bob,ou=People","types":[["cn"]]}"#;
        let error = serde_json::from_str::<Name>(json).expect_err("one RDN short");
        assert!(error.to_string().contains("canonical types"));
    }
}

mod algebra_tests {
    use rstest::rstest;

    use crate::{Name, Rdn};

    fn name(text: &str) -> Name {
        Name::parse(text).expect("valid test name")
    }

    #[test]
    fn parent_strips_leaf() {
        let child = name("cn=x,ou=accounts,ou=system");
        assert_eq!(child.parent(), Some(name("ou=accounts,ou=system")));
        assert_eq!(name("ou=system").parent(), Some(Name::root()));
    }

    #[rstest]
    #[case("cn=x,ou=system", "ou=system", true)]
    #[case("ou=system", "ou=system", true)]
    #[case("ou=system", "cn=x,ou=system", false)]
    #[case("cn=x,ou=other", "ou=system", false)]
    #[case("cn=x,ou=system", "", true)]
    fn is_within_matches_suffixes(#[case] subject: &str, #[case] base: &str, #[case] expected: bool) {
        assert_eq!(name(subject).is_within(&name(base)), expected);
    }

    #[test]
    fn descendant_and_child_relations() {
        let base = name("ou=system");
        let child = name("cn=x,ou=system");
        let grandchild = name("cn=y,cn=x,ou=system");
        assert!(child.is_child_of(&base));
        assert!(!grandchild.is_child_of(&base));
        assert!(grandchild.is_descendant_of(&base));
        assert!(!base.is_descendant_of(&base));
    }

    #[test]
    fn child_and_concat_compose() {
        let base = name("ou=system");
        let rdn = Rdn::new("cn", "New Entry").expect("rdn");
        let child = base.child(rdn);
        assert_eq!(child.normalized(), "cn=new entry,ou=system");

        let relative = name("cn=a,ou=b");
        assert_eq!(base.concat(&relative).normalized(), "cn=a,ou=b,ou=system");
    }

    #[test]
    fn rebase_moves_between_subtrees() {
        let entry = name("cn=a,ou=old,ou=system");
        let moved = entry
            .rebase(&name("ou=old,ou=system"), &name("ou=new,ou=system"))
            .expect("entry is within old base");
        assert_eq!(moved.normalized(), "cn=a,ou=new,ou=system");
        assert!(entry.rebase(&name("ou=elsewhere"), &name("ou=new")).is_none());
    }

    #[test]
    fn normalized_ancestors_are_longest_first() {
        let entry = name("CN=X,OU=Accounts,OU=System");
        let ancestors: Vec<&str> = entry.normalized_ancestors().collect();
        assert_eq!(
            ancestors,
            vec!["cn=x,ou=accounts,ou=system", "ou=accounts,ou=system", "ou=system"]
        );
        assert_eq!(entry.ancestors().count(), 3);
    }

    #[test]
    fn multi_valued_rdns_compare_regardless_of_order() {
        let first = Rdn::parse("cn=a+uid=b").expect("rdn");
        let second = Rdn::parse("UID=B + CN=A").expect("rdn");
        assert_eq!(first, second);
        assert!(first.is_multi_valued());
        assert!(first.contains("UID", "b"));
        assert_eq!(first.attr_type(), "cn");
    }

    #[test]
    fn constructed_rdn_escapes_user_form() {
        let rdn = Rdn::new("cn", "Smith, John").expect("rdn");
        assert_eq!(rdn.user_provided(), "cn=Smith\\, John");
        let reparsed = Rdn::parse(rdn.user_provided()).expect("reparse");
        assert_eq!(reparsed.value(), "Smith, John");
    }
}
