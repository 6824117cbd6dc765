use mist::proxy::HostMatcher;

fn matcher(entries: &[(&str, &str)]) -> HostMatcher {
    let mut m = HostMatcher::new();
    for (pattern, address) in entries {
        m.add_mapping(pattern, *address);
    }
    m
}

#[test]
fn test_wildcard_matches_subdomains_and_bare_domain() {
    let m = matcher(&[("*.example.com", "127.0.0.1:9000")]);

    for host in ["foo.example.com", "a.b.example.com", "example.com", "FOO.Example.COM"] {
        assert_eq!(m.resolve(host), Some("127.0.0.1:9000"), "host {host}");
    }
    for host in ["example.org", "badexample.com", "example.com.evil", "com", ""] {
        assert_eq!(m.resolve(host), None, "host {host}");
    }
}

#[test]
fn test_exact_pattern_matches_only_itself() {
    let m = matcher(&[("API.example.com", "127.0.0.1:9001")]);

    assert_eq!(m.resolve("api.example.com"), Some("127.0.0.1:9001"));
    assert_eq!(m.resolve("Api.Example.Com"), Some("127.0.0.1:9001"));
    assert_eq!(m.resolve("x.api.example.com"), None);
    assert_eq!(m.resolve("example.com"), None);
}

#[test]
fn test_last_write_wins() {
    let mut m = matcher(&[("a.com", "10.0.0.1:80")]);
    m.add_mapping("a.com", "10.0.0.2:80");
    assert_eq!(m.resolve("a.com"), Some("10.0.0.2:80"));

    m.add_mapping("*.b.com", "10.0.0.3:80");
    m.add_mapping("*.B.COM", "10.0.0.4:80");
    assert_eq!(m.resolve("x.b.com"), Some("10.0.0.4:80"));
    assert_eq!(m.len(), 2);
}

#[test]
fn test_exact_beats_wildcard() {
    let m = matcher(&[
        ("*.example.com", "10.0.0.1:80"),
        ("example.com", "10.0.0.2:80"),
        ("www.example.com", "10.0.0.3:80"),
    ]);

    assert_eq!(m.resolve("example.com"), Some("10.0.0.2:80"));
    assert_eq!(m.resolve("www.example.com"), Some("10.0.0.3:80"));
    assert_eq!(m.resolve("mail.example.com"), Some("10.0.0.1:80"));
}

#[test]
fn test_longest_wildcard_wins_regardless_of_insertion_order() {
    let forward = matcher(&[("*.example.com", "10.0.0.1:80"), ("*.api.example.com", "10.0.0.2:80")]);
    let reverse = matcher(&[("*.api.example.com", "10.0.0.2:80"), ("*.example.com", "10.0.0.1:80")]);

    for m in [&forward, &reverse] {
        assert_eq!(m.resolve("v1.api.example.com"), Some("10.0.0.2:80"));
        assert_eq!(m.resolve("api.example.com"), Some("10.0.0.2:80"));
        assert_eq!(m.resolve("www.example.com"), Some("10.0.0.1:80"));
    }
}

#[test]
fn test_empty_table_resolves_nothing() {
    let m = HostMatcher::new();

    assert!(m.is_empty());
    assert_eq!(m.resolve("anything.example"), None);
}
