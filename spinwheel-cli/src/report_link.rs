use spinwheel_db::models::ReportConfig;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLink {
    pub url: String,
    pub credentialed: bool,
}

impl ReportLink {
    pub fn status(&self) -> &'static str {
        if self.credentialed {
            "🔐 Link generated with saved credentials."
        } else {
            "🔗 Link is using the base URL (credentials not set)."
        }
    }
}

/// External report address, with the saved username/password placed in the
/// userinfo part when both are configured. `Url` validates the base and
/// percent-encodes the userinfo; the rest of the base is kept as written.
pub fn build_report_link(config: &ReportConfig) -> ReportLink {
    let base = config.report_base_address.trim();
    let plain = ReportLink {
        url: base.to_string(),
        credentialed: false,
    };
    if !config.has_credentials() {
        return plain;
    }

    let (scheme, rest) = base.split_once("://").unwrap_or(("https", base));
    let candidate = format!("{scheme}://{rest}");

    let mut url = match Url::parse(&candidate) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Report base '{base}' is not a valid URL ({e}); using it without credentials");
            return plain;
        }
    };

    if url.set_username(&config.username).is_err()
        || url.set_password(Some(&config.password)).is_err()
    {
        log::warn!("Report base '{base}' cannot carry credentials; using it as is");
        return plain;
    }

    let userinfo = format!("{}:{}", url.username(), url.password().unwrap_or_default());
    ReportLink {
        url: format!("{scheme}://{userinfo}@{rest}"),
        credentialed: true,
    }
}
