/// Cookies handed out by the quote page. Owned by a single worker and used for
/// exactly one data request; never stored in a shared jar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredential {
    cookies: Vec<(String, String)>,
}

impl SessionCredential {
    /// Build from raw `Set-Cookie` header values. Attributes (`Path`,
    /// `Expires`, ...) are dropped; a later cookie with the same name replaces
    /// an earlier one.
    pub fn from_set_cookie<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut cred = SessionCredential::default();
        for header in headers {
            let pair = header.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            cred.insert(name, value.trim());
        }
        cred
    }

    fn insert(&mut self, name: &str, value: &str) {
        match self.cookies.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.cookies.push((name.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for a request `Cookie` header, or `None` when there is nothing to send.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .cookies
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect();
        Some(parts.join("; "))
    }
}
