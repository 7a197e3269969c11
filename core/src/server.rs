pub mod server {

    use heapless::String;

    // Codes carried in the server's flag payload
    pub const ERROR_CODE: i32 = -1;
    pub const NULL_CODE: i32 = 0;
    pub const ALERT_CODE: i32 = 1;
    pub const RESET_CODE: i32 = 2;
    pub const SLEEP_UPDATE_CODE: i32 = 3;

    pub const URL_LEN: usize = 192;
    pub const PAYLOAD_LEN: usize = 64;

    // Proxy server API endpoints
    const API_PATH: &str = "/api/key/";
    const FLAG_ENDPOINT: &str = "/box/alert-pending";
    const CLEAR_FLAG_ENDPOINT: &str = "/box/clear-alert";
    const SLEEP_START_ENDPOINT: &str = "/box/get-sleep-start";
    const SLEEP_TIME_ENDPOINT: &str = "/box/get-sleep-time";
    const SEND_MESSAGE_ENDPOINT: &str = "/box/send-message/";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum TransportError {
        NotConnected,
        Protocol,
        Timeout,
    }

    /// The network capability the client runs on: an authenticated-by-URL
    /// GET returning the response body.
    pub trait Transport {
        fn is_connected(&mut self) -> bool;
        fn get(&mut self, url: &str) -> Result<String<PAYLOAD_LEN>, TransportError>;
    }

    /// Client for the phone-app proxy service.
    ///
    /// All calls degrade to `ERROR_CODE`/`false` style results when the
    /// link is down; the box keeps running on whatever it knew last.
    pub struct ProxyClient {
        domain: &'static str,
        token: &'static str,
        unresponsive: bool,
    }

    impl ProxyClient {
        pub fn new(domain: &'static str, token: &'static str) -> Self {
            ProxyClient {
                domain,
                token,
                unresponsive: false,
            }
        }

        /// Check the status flag on the proxy server, clearing it when set.
        pub fn check_flag(&mut self, link: &mut impl Transport) -> i32 {
            if !link.is_connected() {
                return ERROR_CODE;
            }
            let flag = parse_result(&self.request(link, FLAG_ENDPOINT, ""));
            if flag != NULL_CODE {
                self.clear_flag(link);
            }
            flag
        }

        /// Clear the status flag on the proxy server.
        pub fn clear_flag(&mut self, link: &mut impl Transport) -> bool {
            if !link.is_connected() {
                return false;
            }
            self.request(link, CLEAR_FLAG_ENDPOINT, "");
            true
        }

        /// Hour of day at which the nightly sleep window opens.
        pub fn sleep_start(&mut self, link: &mut impl Transport) -> i32 {
            if !link.is_connected() {
                return NULL_CODE;
            }
            parse_result(&self.request(link, SLEEP_START_ENDPOINT, ""))
        }

        /// Length of the nightly sleep window, in minutes.
        pub fn sleep_time(&mut self, link: &mut impl Transport) -> i32 {
            if !link.is_connected() {
                return NULL_CODE;
            }
            parse_result(&self.request(link, SLEEP_TIME_ENDPOINT, ""))
        }

        /// Push one of the canned notification messages to the phone app.
        pub fn send_message(&mut self, link: &mut impl Transport, message: &str) -> bool {
            if !link.is_connected() {
                return false;
            }
            !self.request(link, SEND_MESSAGE_ENDPOINT, message).is_empty()
        }

        /// Whether the server failed to answer the most recent request.
        pub fn is_unresponsive(&mut self, link: &mut impl Transport) -> bool {
            !link.is_connected() || self.unresponsive
        }

        fn request(
            &mut self,
            link: &mut impl Transport,
            endpoint: &str,
            suffix: &str,
        ) -> String<PAYLOAD_LEN> {
            let url = self.url_for(endpoint, suffix);
            let payload = link.get(&url).unwrap_or_default();
            self.unresponsive = payload.is_empty();
            payload
        }

        fn url_for(&self, endpoint: &str, suffix: &str) -> String<URL_LEN> {
            let mut url: String<URL_LEN> = String::new();
            url.push_str(self.domain).unwrap();
            url.push_str(API_PATH).unwrap();
            url.push_str(self.token).unwrap();
            url.push_str(endpoint).unwrap();
            url.push_str(suffix).unwrap();
            url
        }
    }

    /// Pull the integer out of a `[flag,value]` payload. Anything malformed
    /// comes back as `ERROR_CODE`.
    pub fn parse_result(payload: &str) -> i32 {
        let comma = match payload.find(',') {
            Some(index) => index,
            None => return ERROR_CODE,
        };
        let bracket = match payload.find(']') {
            Some(index) => index,
            None => return ERROR_CODE,
        };
        if bracket < comma {
            return ERROR_CODE;
        }
        payload[comma + 1..bracket].trim().parse().unwrap_or(ERROR_CODE)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use core::str::FromStr;
        use std::collections::VecDeque;

        const DOMAIN: &str = "https://proxy.example.com";
        const TOKEN: &str = "sekrit";

        struct FakeServer {
            connected: bool,
            responses: VecDeque<&'static str>,
            requests: Vec<std::string::String>,
        }

        impl FakeServer {
            fn with_responses(responses: &[&'static str]) -> Self {
                FakeServer {
                    connected: true,
                    responses: responses.iter().copied().collect(),
                    requests: Vec::new(),
                }
            }
        }

        impl Transport for FakeServer {
            fn is_connected(&mut self) -> bool {
                self.connected
            }

            fn get(&mut self, url: &str) -> Result<String<PAYLOAD_LEN>, TransportError> {
                self.requests.push(url.into());
                match self.responses.pop_front() {
                    Some(body) => Ok(String::from_str(body).unwrap()),
                    None => Err(TransportError::Timeout),
                }
            }
        }

        #[test]
        fn payload_parsing_extracts_the_second_field() {
            assert_eq!(parse_result("[1,5]"), 5);
            assert_eq!(parse_result("[0,0]"), 0);
            assert_eq!(parse_result("[1,480]"), 480);
        }

        #[test]
        fn malformed_payloads_parse_to_the_error_code() {
            assert_eq!(parse_result(""), ERROR_CODE);
            assert_eq!(parse_result("flag"), ERROR_CODE);
            assert_eq!(parse_result("[5]"), ERROR_CODE);
            assert_eq!(parse_result("[1,]"), ERROR_CODE);
            assert_eq!(parse_result("],1["), ERROR_CODE);
            assert_eq!(parse_result("[1,x2]"), ERROR_CODE);
        }

        #[test]
        fn urls_carry_the_token_between_api_path_and_endpoint() {
            let client = ProxyClient::new(DOMAIN, TOKEN);
            assert_eq!(
                client.url_for("/box/alert-pending", ""),
                "https://proxy.example.com/api/key/sekrit/box/alert-pending"
            );
            assert_eq!(
                client.url_for("/box/send-message/", "good-night"),
                "https://proxy.example.com/api/key/sekrit/box/send-message/good-night"
            );
        }

        #[test]
        fn a_raised_flag_is_read_and_then_cleared() {
            let mut server = FakeServer::with_responses(&["[1,1]", "[1,0]"]);
            let mut client = ProxyClient::new(DOMAIN, TOKEN);
            assert_eq!(client.check_flag(&mut server), ALERT_CODE);
            assert_eq!(server.requests.len(), 2);
            assert!(server.requests[0].ends_with("/box/alert-pending"));
            assert!(server.requests[1].ends_with("/box/clear-alert"));
        }

        #[test]
        fn a_null_flag_is_not_cleared() {
            let mut server = FakeServer::with_responses(&["[1,0]"]);
            let mut client = ProxyClient::new(DOMAIN, TOKEN);
            assert_eq!(client.check_flag(&mut server), NULL_CODE);
            assert_eq!(server.requests.len(), 1);
        }

        #[test]
        fn flag_checks_without_a_link_fail_fast() {
            let mut server = FakeServer::with_responses(&[]);
            server.connected = false;
            let mut client = ProxyClient::new(DOMAIN, TOKEN);
            assert_eq!(client.check_flag(&mut server), ERROR_CODE);
            assert!(server.requests.is_empty());
            assert!(client.is_unresponsive(&mut server));
        }

        #[test]
        fn an_empty_reply_marks_the_server_unresponsive() {
            let mut server = FakeServer::with_responses(&["", ""]);
            let mut client = ProxyClient::new(DOMAIN, TOKEN);
            client.check_flag(&mut server);
            assert!(client.is_unresponsive(&mut server));
            server.responses.push_back("[1,0]");
            client.check_flag(&mut server);
            assert!(!client.is_unresponsive(&mut server));
        }

        #[test]
        fn sleep_parameters_come_back_as_plain_numbers() {
            let mut server = FakeServer::with_responses(&["[1,22]", "[1,480]"]);
            let mut client = ProxyClient::new(DOMAIN, TOKEN);
            assert_eq!(client.sleep_start(&mut server), 22);
            assert_eq!(client.sleep_time(&mut server), 480);
        }

        #[test]
        fn sending_a_message_reports_whether_the_server_answered() {
            let mut server = FakeServer::with_responses(&["ok", ""]);
            let mut client = ProxyClient::new(DOMAIN, TOKEN);
            assert!(client.send_message(&mut server, "good-morning"));
            assert!(server.requests[0].ends_with("/box/send-message/good-morning"));
            assert!(!client.send_message(&mut server, "good-night"));
        }
    }
}
