//! CLI exit codes.
//!
//! Exit codes are part of the shell contract: scripts driving `ogrid`
//! branch on them.
//!
//! | Code | Meaning                                               |
//! |------|-------------------------------------------------------|
//! | 0    | Success                                               |
//! | 1    | Error: unreadable input, malformed JSON, bad options  |
//! | 2    | Usage: bad arguments (clap also exits 2 on its own)   |

/// Command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// Input could not be read, parsed or validated.
pub const EXIT_ERROR: u8 = 1;

/// Arguments are inconsistent or missing.
pub const EXIT_USAGE: u8 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
