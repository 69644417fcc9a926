use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left untouched when a shortname is normalized, on top of
/// alphanumerics. This mirrors the classic URL "fix" safe set; `%` is kept
/// so that already-encoded input is not encoded a second time.
const KEEP: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'/')
	.remove(b'%')
	.remove(b';')
	.remove(b':')
	.remove(b'@')
	.remove(b'&')
	.remove(b'=')
	.remove(b'+')
	.remove(b'$')
	.remove(b',')
	.remove(b'-')
	.remove(b'.')
	.remove(b'_')
	.remove(b'~');

/// Normalizes a raw title or custom shortname into the URL-safe, lowercase
/// form that is persisted as a post shortname.
///
/// The function is pure and idempotent: feeding its own output back in
/// returns the same string, so a shortname can be re-saved without drifting.
/// Uniqueness is *not* checked here; the UNIQUE constraint on the post table
/// is the only authority on that, and its violation surfaces at save time.
pub fn normalize(raw: &str) -> String {
	// Percent escapes are emitted with uppercase hex; lowercase them as well
	// so the stored form is fully lowercase and a second pass is a no-op.
	utf8_percent_encode(&raw.to_lowercase(), KEEP)
		.to_string()
		.to_lowercase()
}
