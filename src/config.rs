use crate::notify::{EmailConfig, NotifyConfig, TwilioConfig};

/// Process configuration, read once from the environment in `main` and
/// carried in `AppState`. Anything unset simply disables its feature.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Shared secret for admin methods and the maintenance toggle.
    pub api_password: Option<String>,
    pub notify: NotifyConfig,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Config {
        let twilio = match (
            env_nonempty("TWILIO_ACCOUNT_SID"),
            env_nonempty("TWILIO_AUTH_TOKEN"),
            env_nonempty("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };
        let email = match (env_nonempty("EMAIL_API_KEY"), env_nonempty("EMAIL_FROM")) {
            (Some(api_key), Some(from)) => Some(EmailConfig {
                api_url: env_nonempty("EMAIL_API_URL")
                    .unwrap_or_else(|| "https://api.sendgrid.com/v3/mail/send".to_string()),
                api_key,
                from,
            }),
            _ => None,
        };
        Config {
            api_password: env_nonempty("API_PASSWORD"),
            notify: NotifyConfig { twilio, email },
        }
    }
}
