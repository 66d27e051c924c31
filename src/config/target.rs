// ABOUTME: Connection target parsing.
// ABOUTME: Parses "[user@]host[:port]", with IPv6 addresses bare or as "[addr]:port".

/// Where to connect, as written on the command line or in a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
}

impl Target {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("target cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user_part, rest) = match s.rfind('@') {
            Some(at_pos) => (Some(&s[..at_pos]), &s[at_pos + 1..]),
            None => (None, s),
        };

        if user_part.is_some_and(str::is_empty) {
            return Err("username cannot be empty".to_string());
        }

        let (host, port) = split_host_port(rest)?;

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(Target {
            host: host.to_string(),
            port,
            user: user_part.map(str::to_string),
        })
    }
}

/// Split `host[:port]`. A bare IPv6 address has no port; use `[addr]:port`.
fn split_host_port(rest: &str) -> Result<(&str, Option<u16>), String> {
    if let Some(bracketed) = rest.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| format!("unclosed '[' in {}", rest))?;
        return match after {
            "" => Ok((host, None)),
            _ => match after.strip_prefix(':') {
                Some(port) => Ok((host, Some(parse_port(port)?))),
                None => Err(format!("unexpected text after ']': {}", after)),
            },
        };
    }

    match rest.split_once(':') {
        Some((host, port)) if !port.contains(':') => Ok((host, Some(parse_port(port)?))),
        _ => Ok((rest, None)),
    }
}

fn parse_port(s: &str) -> Result<u16, String> {
    s.parse::<u16>().map_err(|_| format!("invalid port: {}", s))
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
