use crate::parse_port;

#[test]
fn test_parse_port_valid() {
    assert_eq!(parse_port("8001").unwrap(), 8001);
    assert_eq!(parse_port("1").unwrap(), 1);
    assert_eq!(parse_port("65535").unwrap(), 65535);
}

#[test]
fn test_parse_port_invalid() {
    // Not a number
    assert!(parse_port("rpm").is_err());

    // Out of range
    assert!(parse_port("65536").is_err());
    assert!(parse_port("-1").is_err());

    // Zero is never a worker port
    assert!(parse_port("0").is_err());

    // Empty
    assert!(parse_port("").is_err());
}
