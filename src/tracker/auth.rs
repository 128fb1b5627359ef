use crate::error::{ReleaseError, Result};
use crate::tracker::IssueTracker;
use crate::ui::{Output, Prompter};
use secrecy::SecretString;
use std::fmt;

/// Credential attempts before giving up
pub const MAX_ATTEMPTS: usize = 5;

/// Username and API token for the tracker
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub token: SecretString,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Connect to the tracker, prompting for credentials until they are accepted.
///
/// `initial` (e.g. a token from the environment) is tried first and counts
/// as an attempt. A configured `username` is reused on every prompt. After
/// [MAX_ATTEMPTS] rejections this fails with an authentication error.
/// Transport errors are not retried.
pub fn authenticate<T, F>(
    prompter: &dyn Prompter,
    output: &dyn Output,
    username: Option<&str>,
    initial: Option<Credentials>,
    mut connect: F,
) -> Result<T>
where
    T: IssueTracker,
    F: FnMut(Credentials) -> Result<T>,
{
    let mut pending = initial;

    for attempt in 1..=MAX_ATTEMPTS {
        let credentials = match pending.take() {
            Some(credentials) => credentials,
            None => Credentials {
                username: match username {
                    Some(name) => name.to_string(),
                    None => prompter.input("Tracker username")?,
                },
                token: prompter.secret("Tracker API token")?,
            },
        };

        let tracker = connect(credentials)?;
        if tracker.check_credentials()? {
            return Ok(tracker);
        }
        output.warning(&format!(
            "Tracker rejected the credentials (attempt {}/{})",
            attempt, MAX_ATTEMPTS
        ));
    }

    Err(ReleaseError::authentication(format!(
        "tracker rejected credentials {} times",
        MAX_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::MockTracker;
    use crate::ui::{LinePrompter, RecordingOutput};
    use secrecy::ExposeSecret;
    use std::io::{self, Cursor};

    fn prompter(input: &str) -> LinePrompter<Cursor<Vec<u8>>, io::Sink> {
        LinePrompter::new(Cursor::new(input.as_bytes().to_vec()), io::sink())
    }

    #[test]
    fn test_initial_credentials_accepted_without_prompt() {
        let output = RecordingOutput::new();
        let initial = Credentials {
            username: "bot".to_string(),
            token: SecretString::from("env-token".to_string()),
        };
        let mut seen = Vec::new();
        authenticate(&prompter(""), &output, None, Some(initial), |c| {
            seen.push(c.token.expose_secret().to_string());
            Ok(MockTracker::new())
        })
        .unwrap();
        assert_eq!(seen, vec!["env-token"]);
    }

    #[test]
    fn test_retries_until_accepted() {
        let output = RecordingOutput::new();
        let mut attempts = 0;
        authenticate(
            &prompter("first\nsecond\nthird\n"),
            &output,
            Some("bot"),
            None,
            |c| {
                attempts += 1;
                Ok(if c.token.expose_secret() == "third" {
                    MockTracker::new()
                } else {
                    MockTracker::rejecting()
                })
            },
        )
        .unwrap();
        assert_eq!(attempts, 3);
        assert!(output.contains("attempt 2/5"));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let output = RecordingOutput::new();
        let input = "bad\n".repeat(MAX_ATTEMPTS + 2);
        let mut attempts = 0;
        let result = authenticate(&prompter(&input), &output, Some("bot"), None, |_| {
            attempts += 1;
            Ok(MockTracker::rejecting())
        });
        assert!(matches!(result, Err(ReleaseError::Authentication(_))));
        assert_eq!(attempts, MAX_ATTEMPTS);
    }
}
