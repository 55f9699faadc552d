//! Fixed tables of third-party echo services behind the check strategies.

/// Endpoint queried once, directly, at startup to learn the operator's own
/// external IP.
pub(crate) const OPERATOR_IP_URL: &str = "https://ifconfig.me/ip";

/// First-pass sites: echo the apparent source IP and nothing else.
pub(crate) const FIRST_PASS: &[&str] = &[
    "https://ifconfig.me/ip",
    "https://ifconfig.io/ip",
    "https://myexternalip.com/raw",
    "https://ipv4.icanhazip.com/",
    "https://ipinfo.io/ip",
    "https://api.ipify.org/",
    "https://wtfismyip.com/text",
];

/// Second-pass sites: echo request headers as well (X-Forwarded-For and
/// friends), paired with a marker that a well-formed response must contain.
pub(crate) const SECOND_PASS: &[(&str, &str)] = &[
    ("https://ifconfig.me/all", "user_agent"),
    ("https://ifconfig.io/all.json", "ifconfig_hostname"),
];
