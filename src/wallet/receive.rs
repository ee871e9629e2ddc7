//! BIP21 payment URIs for the receive screen.

const SATS_PER_BTC: u64 = 100_000_000;

/// `bitcoin:<addr>?amount=..&label=..&message=..`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub amount_sat: Option<u64>,
    pub label: Option<String>,
    pub message: Option<String>,
}

impl ReceiveRequest {
    pub fn new() -> Self { Self::default() }
    pub fn with_amount(mut self, sats: u64) -> Self { self.amount_sat = Some(sats); self }
    pub fn with_label(mut self, label: impl Into<String>) -> Self { self.label = Some(label.into()); self }
    pub fn with_message(mut self, message: impl Into<String>) -> Self { self.message = Some(message.into()); self }

    pub fn to_uri(&self, address: &str) -> String {
        let mut uri = format!("bitcoin:{}", address);
        let mut query = Vec::new();
        if let Some(amount) = self.amount_sat {
            query.push(format!("amount={}", format_btc(amount)));
        }
        if let Some(label) = self.label.as_deref().filter(|s| !s.is_empty()) {
            query.push(format!("label={}", percent_encode(label)));
        }
        if let Some(message) = self.message.as_deref().filter(|s| !s.is_empty()) {
            query.push(format!("message={}", percent_encode(message)));
        }
        if !query.is_empty() {
            uri.push('?');
            uri.push_str(&query.join("&"));
        }
        uri
    }
}

/// Satoshis as a fixed 8-decimal BTC string.
pub fn format_btc(amount_sat: u64) -> String {
    format!("{}.{:08}", amount_sat / SATS_PER_BTC, amount_sat % SATS_PER_BTC)
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &b in value.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "tb1q6rz28mcfaxtmd6v789l9rrlrusdprr9pqcpvkl";

    #[test]
    fn test_format_btc() {
        assert_eq!(format_btc(0), "0.00000000");
        assert_eq!(format_btc(12_345), "0.00012345");
        assert_eq!(format_btc(2_100_000_000), "21.00000000");
    }

    #[test]
    fn test_bare_uri() {
        assert_eq!(ReceiveRequest::new().to_uri(ADDR), format!("bitcoin:{}", ADDR));
    }

    #[test]
    fn test_full_uri() {
        let uri = ReceiveRequest::new()
            .with_amount(50_000)
            .with_label("Coffee & cake")
            .with_message("thanks!")
            .to_uri(ADDR);
        assert_eq!(
            uri,
            format!("bitcoin:{}?amount=0.00050000&label=Coffee%20%26%20cake&message=thanks%21", ADDR)
        );
    }

    #[test]
    fn test_empty_label_omitted() {
        let uri = ReceiveRequest::new().with_label("").to_uri(ADDR);
        assert!(!uri.contains('?'));
    }
}
