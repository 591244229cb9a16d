/// Parse `"a,b"` into a pair, for command-line arguments such as image sizes
pub fn parse_pair<T: std::str::FromStr>(s: &str) -> Result<(T, T), String>
where
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    let v = s.split(',').map(str::trim).collect::<Vec<_>>();
    if v.len() != 2 {
        return Err(format!("expected two comma-separated values, got '{s}'"));
    }
    let parse = |x: &str| x.parse::<T>().map_err(|e| format!("'{x}': {e}"));
    Ok((parse(v[0])?, parse(v[1])?))
}

/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}


pub mod timing {

    use super::group_digits;
    use std::time::Instant;
    use std::io::Write;

    pub struct Timer {
        previous: Instant,
    }

    impl Timer {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { previous: Instant::now() } }

        /// Print message, append ellipsis, flush stdout, stay on same line, start timer.
        pub fn start(&mut self, message: &str) {
            print!("{message} ... ");
            // A failed flush only delays the message
            let _ = std::io::stdout().flush();
            self.start_timer();
        }

        // Print time elapsed since last start or done
        pub fn done(&mut self) {
            println!("{} ms", group_digits(self.elapsed_ms()));
            self.start_timer();
        }

        // Print message followed by time elapsed since last start or done
        pub fn done_with_message(&mut self, message: &str) {
            println!("{message}: {} ms", group_digits(self.elapsed_ms()));
            self.start_timer();
        }

        pub fn elapsed_ms(&self) -> u128 { self.previous.elapsed().as_millis() }

        fn start_timer(&mut self) { self.previous = Instant::now() }
    }
}
