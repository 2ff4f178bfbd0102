/// A value with a single line text form, used by checkpoint files.
///
/// The text form must not contain tabs or newlines.
pub trait Record: Sized {
    /// Appends the text form of `self` to `out`.
    fn write_record(&self, out: &mut String);

    /// Parses the text form written by `write_record`.
    fn parse_record(s: &str) -> Option<Self>;
}

macro_rules! impl_display_record {
    ($($ty:ty),* $(,)?) => {$(
        impl Record for $ty {
            fn write_record(&self, out: &mut String) {
                out.push_str(&self.to_string());
            }

            fn parse_record(s: &str) -> Option<Self> {
                s.trim().parse().ok()
            }
        }
    )*};
}

impl_display_record!(u32, u64, i32, i64, f32, f64);

/// Writes a dense vector as space separated floats.
pub fn write_floats(xs: &[f32], out: &mut String) {
    for (i, x) in xs.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        x.write_record(out);
    }
}

impl Record for Vec<f32> {
    fn write_record(&self, out: &mut String) {
        write_floats(self, out);
    }

    fn parse_record(s: &str) -> Option<Self> {
        s.split_whitespace().map(f32::parse_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_text_is_exact() {
        let values = vec![0.1f32, -3.25, 1e-7, f32::MAX];

        let mut out = String::new();
        values.write_record(&mut out);

        assert_eq!(Vec::<f32>::parse_record(&out).unwrap(), values);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(u64::parse_record("12x").is_none());
        assert!(Vec::<f32>::parse_record("1.0 nope").is_none());
    }
}
