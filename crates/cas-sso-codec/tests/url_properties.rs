#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Property tests for browser-facing URLs

use cas_sso_codec::{Endpoints, LoginOptions, ticket_from_url};
use proptest::prelude::*;
use url::Url;

fn callback_path() -> impl Strategy<Value = String> {
    // path segments plus characters that need escaping in a query value
    "[a-z0-9/]{0,12}(\\?[a-z]{1,4}=[a-z0-9 &%+=]{0,8})?"
}

fn login_options() -> impl Strategy<Value = LoginOptions> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(gateway, renew, use_post)| {
        LoginOptions {
            gateway,
            renew,
            use_post,
        }
    })
}

proptest! {
    /// The callback travels exactly once, decodes back to itself, and no
    /// parameter name repeats
    #[test]
    fn login_form_url_encodes_callback_once(path in callback_path(), options in login_options()) {
        let callback = format!("https://app.example.com/{path}");
        let endpoints = Endpoints::new(
            "https://cas.example.com/cas/",
            "https://app.example.com/",
            &callback,
        )
        .unwrap();
        let expected_callback = callback.clone();

        let login = Url::parse(&endpoints.login_form_url(options)).unwrap();
        prop_assert_eq!(login.path(), "/cas/login");

        let pairs: Vec<(String, String)> = login
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let services: Vec<&String> = pairs
            .iter()
            .filter(|(k, _)| k == "service")
            .map(|(_, v)| v)
            .collect();
        prop_assert_eq!(services, vec![&expected_callback]);

        let mut names: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        prop_assert_eq!(names.len(), total);

        prop_assert_eq!(pairs.iter().any(|(k, _)| k == "gateway"), options.gateway);
        prop_assert_eq!(pairs.iter().any(|(k, _)| k == "renew"), options.renew);
        prop_assert_eq!(pairs.iter().any(|(k, _)| k == "method"), options.use_post);
    }

    /// A ticket appended to the callback is always found again
    #[test]
    fn ticket_survives_callback_round_trip(ticket in "ST-[0-9]{1,8}-[A-Za-z0-9]{1,20}") {
        let mut callback = Url::parse("https://app.example.com/login?next=%2Fhome").unwrap();
        callback.query_pairs_mut().append_pair("ticket", &ticket);
        prop_assert_eq!(ticket_from_url(callback.as_str()), Some(ticket));
    }
}
