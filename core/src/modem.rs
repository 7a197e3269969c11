pub mod modem {

    use core::fmt::Write as _;

    use embedded_hal_nb::serial::{Read, Write};
    use heapless::{String, Vec};

    use crate::datetime::datetime::{SntpError, SntpExchange, NTP_PACKET_LEN};
    use crate::server::server::{Transport, TransportError, PAYLOAD_LEN};

    const NTP_SERVER: &str = "pool.ntp.org";

    const LINE_LEN: usize = 128;
    const HEAD_LEN: usize = 16;
    const REQUEST_LEN: usize = 320;
    const RESPONSE_LEN: usize = 512;

    // UART poll attempts before a byte is declared missing. Sized for
    // roughly ten seconds of spinning on a 125MHz core; joining an access
    // point can take most of that.
    const DEFAULT_READ_BUDGET: u32 = 50_000_000;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum ModemError {
        Timeout,
        Rejected,
        Overflow,
        Serial,
    }

    enum IpdEvent {
        Chunk,
        Closed,
    }

    /// ESP-AT Wi-Fi co-processor on a UART.
    ///
    /// Single-connection mode throughout: one `AT+CIPSTART` at a time,
    /// incoming data arrives as `+IPD,<len>:` chunks.
    pub struct WifiModem<U> {
        serial: U,
        joined: bool,
        read_budget: u32,
    }

    impl<U: Read<u8> + Write<u8>> WifiModem<U> {
        pub fn new(serial: U) -> Self {
            WifiModem {
                serial,
                joined: false,
                read_budget: DEFAULT_READ_BUDGET,
            }
        }

        /// Restart the AT firmware and put it in station mode with command
        /// echo off.
        pub fn reset(&mut self) -> Result<(), ModemError> {
            self.joined = false;
            self.send_line(&["AT+RST"])?;
            self.wait_for_line("ready")?;
            self.command(&["ATE0"])?;
            self.command(&["AT+CWMODE=1"])
        }

        /// Connect to the access point. Blocks until the modem reports
        /// success or gives up.
        pub fn join(&mut self, ssid: &str, password: &str) -> Result<(), ModemError> {
            self.send_line(&["AT+CWJAP=\"", ssid, "\",\"", password, "\""])?;
            self.wait_for_line("OK")?;
            self.joined = true;
            Ok(())
        }

        /// One HTTPS/HTTP GET, connection closed by the server.
        pub fn http_get(&mut self, url: &str) -> Result<String<PAYLOAD_LEN>, ModemError> {
            let (secure, host, path) = split_url(url);
            let (conn_type, port) = if secure { ("SSL", "443") } else { ("TCP", "80") };
            self.send_line(&["AT+CIPSTART=\"", conn_type, "\",\"", host, "\",", port])?;
            self.wait_for_line("OK")?;

            let mut request: String<REQUEST_LEN> = String::new();
            request.push_str("GET ").unwrap();
            request.push_str(path).unwrap();
            request.push_str(" HTTP/1.1\r\nHost: ").unwrap();
            request.push_str(host).unwrap();
            request.push_str("\r\nConnection: close\r\n\r\n").unwrap();
            self.send_payload(request.as_bytes())?;

            let mut response: Vec<u8, RESPONSE_LEN> = Vec::new();
            loop {
                match self.read_ipd_event(&mut response)? {
                    IpdEvent::Chunk => {}
                    IpdEvent::Closed => break,
                }
            }

            let status = http_status(&response).ok_or(ModemError::Rejected)?;
            if status != 200 && status != 301 {
                return Err(ModemError::Rejected);
            }
            let body = http_body(&response).ok_or(ModemError::Rejected)?;
            let mut payload: String<PAYLOAD_LEN> = String::new();
            for &byte in body {
                if payload.push(byte as char).is_err() {
                    break;
                }
            }
            Ok(payload)
        }

        /// One UDP datagram out, one back.
        fn udp_exchange(
            &mut self,
            host: &str,
            port: &str,
            request: &[u8],
            response: &mut Vec<u8, RESPONSE_LEN>,
        ) -> Result<(), ModemError> {
            self.send_line(&["AT+CIPSTART=\"UDP\",\"", host, "\",", port])?;
            self.wait_for_line("OK")?;
            self.send_payload(request)?;
            loop {
                if let IpdEvent::Chunk = self.read_ipd_event(response)? {
                    break;
                }
            }
            self.command(&["AT+CIPCLOSE"])
        }

        fn send_payload(&mut self, data: &[u8]) -> Result<(), ModemError> {
            let mut command: String<24> = String::new();
            write!(command, "AT+CIPSEND={}", data.len()).unwrap();
            self.send_line(&[&command])?;
            self.wait_for_prompt()?;
            for &byte in data {
                self.write_byte(byte)?;
            }
            self.flush()?;
            self.wait_for_line("SEND OK")
        }

        fn command(&mut self, parts: &[&str]) -> Result<(), ModemError> {
            self.send_line(parts)?;
            self.wait_for_line("OK")
        }

        fn send_line(&mut self, parts: &[&str]) -> Result<(), ModemError> {
            for part in parts {
                for &byte in part.as_bytes() {
                    self.write_byte(byte)?;
                }
            }
            self.write_byte(b'\r')?;
            self.write_byte(b'\n')?;
            self.flush()
        }

        /// Discard lines until `expected` shows up. Error replies from the
        /// modem fail the wait instead.
        fn wait_for_line(&mut self, expected: &str) -> Result<(), ModemError> {
            let mut line: String<LINE_LEN> = String::new();
            loop {
                let byte = self.read_byte()?;
                match byte {
                    b'\r' => {}
                    b'\n' => {
                        let text = line.as_str().trim();
                        if text == expected {
                            return Ok(());
                        }
                        if text == "ERROR" || text == "FAIL" || text == "SEND FAIL" {
                            return Err(ModemError::Rejected);
                        }
                        line.clear();
                    }
                    _ => {
                        if line.push(byte as char).is_err() {
                            line.clear();
                        }
                    }
                }
            }
        }

        // The send prompt is a bare '>' with no line ending
        fn wait_for_prompt(&mut self) -> Result<(), ModemError> {
            loop {
                if self.read_byte()? == b'>' {
                    return Ok(());
                }
            }
        }

        /// Wait for the next `+IPD,<len>:` chunk (appended to `out`) or a
        /// connection close.
        fn read_ipd_event(
            &mut self,
            out: &mut Vec<u8, RESPONSE_LEN>,
        ) -> Result<IpdEvent, ModemError> {
            let mut head: String<HEAD_LEN> = String::new();
            loop {
                let byte = self.read_byte()?;
                match byte {
                    b'\r' => {}
                    b'\n' => {
                        if head.as_str() == "CLOSED" {
                            return Ok(IpdEvent::Closed);
                        }
                        head.clear();
                    }
                    _ => {
                        if head.push(byte as char).is_err() {
                            head.clear();
                        }
                        if head.as_str().ends_with("+IPD,") {
                            let length = self.read_chunk_len()?;
                            for _ in 0..length {
                                let data = self.read_byte()?;
                                out.push(data).map_err(|_| ModemError::Overflow)?;
                            }
                            return Ok(IpdEvent::Chunk);
                        }
                    }
                }
            }
        }

        fn read_chunk_len(&mut self) -> Result<usize, ModemError> {
            let mut length: usize = 0;
            loop {
                let byte = self.read_byte()?;
                match byte {
                    b'0'..=b'9' => length = length * 10 + (byte - b'0') as usize,
                    b':' => return Ok(length),
                    _ => return Err(ModemError::Rejected),
                }
            }
        }

        fn read_byte(&mut self) -> Result<u8, ModemError> {
            for _ in 0..self.read_budget {
                match self.serial.read() {
                    Ok(byte) => return Ok(byte),
                    Err(nb::Error::WouldBlock) => {}
                    Err(nb::Error::Other(_)) => return Err(ModemError::Serial),
                }
            }
            Err(ModemError::Timeout)
        }

        fn write_byte(&mut self, byte: u8) -> Result<(), ModemError> {
            nb::block!(self.serial.write(byte)).map_err(|_| ModemError::Serial)
        }

        fn flush(&mut self) -> Result<(), ModemError> {
            nb::block!(self.serial.flush()).map_err(|_| ModemError::Serial)
        }
    }

    impl<U: Read<u8> + Write<u8>> Transport for WifiModem<U> {
        fn is_connected(&mut self) -> bool {
            self.joined
        }

        fn get(&mut self, url: &str) -> Result<String<PAYLOAD_LEN>, TransportError> {
            self.http_get(url).map_err(|error| match error {
                ModemError::Timeout => TransportError::Timeout,
                _ => TransportError::Protocol,
            })
        }
    }

    impl<U: Read<u8> + Write<u8>> SntpExchange for WifiModem<U> {
        fn exchange(
            &mut self,
            request: &[u8; NTP_PACKET_LEN],
            response: &mut [u8; NTP_PACKET_LEN],
        ) -> Result<(), SntpError> {
            let mut datagram: Vec<u8, RESPONSE_LEN> = Vec::new();
            self.udp_exchange(NTP_SERVER, "123", request, &mut datagram)
                .map_err(|_| SntpError::Network)?;
            if datagram.len() < NTP_PACKET_LEN {
                return Err(SntpError::BadResponse);
            }
            response.copy_from_slice(&datagram[..NTP_PACKET_LEN]);
            Ok(())
        }
    }

    fn split_url(url: &str) -> (bool, &str, &str) {
        let (secure, rest) = if let Some(rest) = url.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = url.strip_prefix("http://") {
            (false, rest)
        } else {
            (true, url)
        };
        match rest.find('/') {
            Some(index) => (secure, &rest[..index], &rest[index..]),
            None => (secure, rest, "/"),
        }
    }

    // "HTTP/1.1 200 OK" -> 200
    fn http_status(response: &[u8]) -> Option<u32> {
        let line_end = response.windows(2).position(|pair| pair == b"\r\n")?;
        let line = core::str::from_utf8(&response[..line_end]).ok()?;
        let mut fields = line.split(' ');
        fields.next()?;
        fields.next()?.parse().ok()
    }

    fn http_body(response: &[u8]) -> Option<&[u8]> {
        let split = response.windows(4).position(|gap| gap == b"\r\n\r\n")?;
        Some(&response[split + 4..])
    }

}
