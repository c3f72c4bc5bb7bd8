//! Classification of RN2903 reply lines

use crate::error::ParseError;

/// Reply to `mac pause`: the number of milliseconds the LoRaWAN stack stays paused
pub const MAC_PAUSE_ACK: &str = "4294967245";

/// Marker that prefixes a received frame
const RX_MARKER: &str = "radio_rx";

/// A single reply line from the modem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `ok` - command accepted
    Ok,
    /// `invalid_param` - command or value rejected
    InvalidParam,
    /// `busy` - radio is busy with another operation
    Busy,
    /// `radio_tx_ok` - transmission completed
    RadioTxOk,
    /// `radio_err` - transmission failed or receive watchdog expired
    RadioErr,
    /// `radio_rx <hex>` - frame received
    RadioRx { payload_hex: String },
    /// Anything else (version strings, numbers, EUIs)
    Other(String),
}

impl Response {
    /// Classify a reply line (without its terminator)
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "ok" => Response::Ok,
            "invalid_param" => Response::InvalidParam,
            "busy" => Response::Busy,
            "radio_tx_ok" => Response::RadioTxOk,
            "radio_err" => Response::RadioErr,
            _ => {
                if let Some(rest) = line.strip_prefix(RX_MARKER) {
                    let payload = rest.trim();
                    if rest.starts_with(char::is_whitespace) && !payload.is_empty() {
                        return Response::RadioRx {
                            payload_hex: payload.to_string(),
                        };
                    }
                }
                Response::Other(line.to_string())
            }
        }
    }
}

/// Parse a numeric reply such as the answer to `radio get rssi`
pub fn parse_numeric<T: std::str::FromStr>(line: &str) -> Result<T, ParseError> {
    line.trim()
        .parse::<T>()
        .map_err(|_| ParseError::NotNumeric(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(Response::parse("ok"), Response::Ok);
        assert_eq!(Response::parse("busy"), Response::Busy);
        assert_eq!(Response::parse("radio_tx_ok"), Response::RadioTxOk);
        assert_eq!(Response::parse("radio_err"), Response::RadioErr);
        assert_eq!(Response::parse("invalid_param"), Response::InvalidParam);
    }

    #[test]
    fn test_parse_rx_frame() {
        assert_eq!(
            Response::parse("radio_rx  48454C4C4F"),
            Response::RadioRx {
                payload_hex: "48454C4C4F".into()
            }
        );
    }

    #[test]
    fn test_rx_marker_without_payload_is_other() {
        assert_eq!(
            Response::parse("radio_rx"),
            Response::Other("radio_rx".into())
        );
        assert_eq!(
            Response::parse("radio_rxfoo"),
            Response::Other("radio_rxfoo".into())
        );
    }

    #[test]
    fn test_parse_other() {
        assert_eq!(
            Response::parse("RN2903 1.0.5 Nov 06 2018 10:45:27"),
            Response::Other("RN2903 1.0.5 Nov 06 2018 10:45:27".into())
        );
        assert_eq!(
            Response::parse(MAC_PAUSE_ACK),
            Response::Other(MAC_PAUSE_ACK.into())
        );
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric::<i32>("-97"), Ok(-97));
        assert_eq!(parse_numeric::<f64>("7"), Ok(7.0));
        assert_eq!(
            parse_numeric::<i32>("busy"),
            Err(ParseError::NotNumeric("busy".into()))
        );
    }
}
