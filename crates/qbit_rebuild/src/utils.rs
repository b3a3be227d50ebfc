/// Number of pieces covering `total_length` bytes. The last piece may be short.
pub fn expected_piece_count(total_length: u64, piece_length: u64) -> u64 {
    if piece_length == 0 {
        return 0;
    }
    total_length.div_ceil(piece_length)
}

pub fn sha1_digest(buf: &[u8]) -> [u8; 20] {
    let mut hasher = sha1_smol::Sha1::new();
    hasher.update(buf);
    hasher.digest().bytes()
}

/// Splits a daemon-reported relative file name into path segments.
///
/// Both `/` and `\` separate segments; empty segments are dropped.
pub fn split_path(name: &str) -> Vec<String> {
    name.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .map(String::from)
        .collect()
}
