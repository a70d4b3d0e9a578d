//! Device classification from the `User-Agent` header. The class partitions the
//! article cache and picks which static URL list gets scraped.

/// Lowercased tokens; matched as substrings of the lowercased header.
const MOBILE_TOKENS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
    "mobile",
    "mobi",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    /// Absent header counts as desktop.
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent else {
            return DeviceClass::Desktop;
        };
        let ua = ua.to_lowercase();
        if MOBILE_TOKENS.iter().any(|t| ua.contains(t)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Desktop => "desktop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phones_and_tablets_are_mobile() {
        for ua in [
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15",
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36",
            "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X)",
            "Opera/9.80 (J2ME/MIDP; OPERA MINI/4.2.14912/870; U; id)",
        ] {
            assert_eq!(DeviceClass::from_user_agent(Some(ua)), DeviceClass::Mobile, "{ua}");
        }
    }

    #[test]
    fn desktop_browsers_and_missing_header_are_desktop() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/126.0";
        assert_eq!(DeviceClass::from_user_agent(Some(ua)), DeviceClass::Desktop);
        assert_eq!(DeviceClass::from_user_agent(None), DeviceClass::Desktop);
        assert_eq!(DeviceClass::from_user_agent(Some("")), DeviceClass::Desktop);
    }
}
