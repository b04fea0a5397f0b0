use reqwest::Url;

use super::types::{MatchResult, FIELD_NUMBER, FIELD_PROJECT, FIELD_REPO};

/// Characters that end a link inside chat text. Slack-style markup wraps
/// links as `<url|label>`.
const LINK_TERMINATORS: &[char] = &['<', '>', '|', ')', '"'];

/// Finds `https://<host>/<project>/<repo>/pull/<number>` links in free text.
/// Plain `http://` links are not considered.
///
/// Stateless apart from the host, so one instance can be shared freely.
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    host: String,
}

impl ReferenceMatcher {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
        }
    }

    /// Returns the first pull request link in `text`, if any.
    pub fn find(&self, text: &str) -> Option<MatchResult> {
        candidate_links(text).find_map(|link| self.parse_link(link))
    }

    fn parse_link(&self, link: &str) -> Option<MatchResult> {
        let url = Url::parse(link).ok()?;
        if url.host_str()? != self.host {
            return None;
        }

        let mut segments = url.path_segments()?;
        let project = segments.next()?;
        let repo = segments.next()?;
        let pull = segments.next()?;
        let number = segments.next()?;

        if project.is_empty() || repo.is_empty() || pull != "pull" {
            return None;
        }
        // Trailing punctuation such as "42." or "42," stays out of the number.
        let digits = number.bytes().take_while(u8::is_ascii_digit).count();
        let number = &number[..digits];
        // Also rejects an empty run and numbers too large to be a pull request.
        number.parse::<u64>().ok()?;

        Some(
            MatchResult::new()
                .with(FIELD_PROJECT, project)
                .with(FIELD_REPO, repo)
                .with(FIELD_NUMBER, number),
        )
    }
}

/// Yields every `https://...` token in the text.
fn candidate_links(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices("https://")
        .map(move |(start, _)| &text[start..])
        .map(|rest| {
            let end = rest
                .find(|c: char| c.is_whitespace() || LINK_TERMINATORS.contains(&c))
                .unwrap_or(rest.len());
            &rest[..end]
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn matcher() -> ReferenceMatcher {
        ReferenceMatcher::new("github.com")
    }

    fn fields(m: &MatchResult) -> (&str, &str, &str) {
        (
            m.get_string(FIELD_PROJECT).unwrap(),
            m.get_string(FIELD_REPO).unwrap(),
            m.get_string(FIELD_NUMBER).unwrap(),
        )
    }

    #[test]
    fn test_match_inline_link() {
        let m = matcher()
            .find("see https://github.com/acme/widgets/pull/42 for details")
            .unwrap();
        assert_eq!(fields(&m), ("acme", "widgets", "42"));
    }

    #[test]
    fn test_match_across_lines() {
        let text = "first line\nplease review:\nhttps://github.com/acme/widgets/pull/7\nthanks";
        let m = matcher().find(text).unwrap();
        assert_eq!(fields(&m), ("acme", "widgets", "7"));
    }

    #[test]
    fn test_match_slack_markup_and_trailing_segments() {
        let m = matcher()
            .find("<https://github.com/acme/widgets/pull/13958/files|PR 13958>")
            .unwrap();
        assert_eq!(fields(&m), ("acme", "widgets", "13958"));
    }

    #[test]
    fn test_trailing_punctuation() {
        let m = matcher()
            .find("merged in https://github.com/acme/widgets/pull/42.")
            .unwrap();
        assert_eq!(fields(&m), ("acme", "widgets", "42"));
    }

    #[test]
    fn test_extra_segments_are_not_absorbed() {
        // A greedy pattern would read project "acme/widgets" here.
        assert!(matcher()
            .find("https://github.com/acme/widgets/tree/pull/42")
            .is_none());
    }

    #[test]
    fn test_first_valid_link_wins() {
        let text =
            "https://github.com/acme/widgets/issues/3 and https://github.com/acme/gears/pull/9";
        let m = matcher().find(text).unwrap();
        assert_eq!(fields(&m), ("acme", "gears", "9"));
    }

    #[test]
    fn test_no_match() {
        let m = matcher();
        assert!(m.find("").is_none());
        assert!(m.find("nothing to see here").is_none());
        assert!(m.find("https://github.com/acme/widgets").is_none());
        assert!(m.find("https://github.com/acme/widgets/pull/").is_none());
        assert!(m.find("https://github.com/acme/widgets/pull/abc").is_none());
        assert!(m.find("https://github.com//widgets/pull/1").is_none());
        assert!(m.find("https://gitlab.com/acme/widgets/pull/1").is_none());
    }

    #[test]
    fn test_plain_http_link_ignored() {
        assert!(matcher()
            .find("http://github.com/acme/widgets/pull/1")
            .is_none());
        let m = matcher()
            .find("http://github.com/acme/widgets/pull/1 https://github.com/acme/gears/pull/2")
            .unwrap();
        assert_eq!(fields(&m), ("acme", "gears", "2"));
    }

    #[test]
    fn test_number_overflowing_u64_is_no_match() {
        assert!(matcher()
            .find("https://github.com/acme/widgets/pull/99999999999999999999999")
            .is_none());
        let m = matcher()
            .find("https://github.com/acme/widgets/pull/18446744073709551615")
            .unwrap();
        assert_eq!(crate::pr::PullRequestRef::try_from(&m).unwrap().number, u64::MAX);
    }

    #[test]
    fn test_custom_host() {
        let m = ReferenceMatcher::new("git.example.org")
            .find("https://git.example.org/team/service/pull/5")
            .unwrap();
        assert_eq!(fields(&m), ("team", "service", "5"));
        assert!(matcher()
            .find("https://git.example.org/team/service/pull/5")
            .is_none());
    }

    proptest! {
        #[test]
        fn test_text_without_pull_link_never_matches(input in "[^/]*") {
            prop_assert!(matcher().find(&input).is_none());
        }

        #[test]
        fn test_random_input_does_not_panic(input in ".*") {
            let _ = matcher().find(&input);
        }
    }
}
