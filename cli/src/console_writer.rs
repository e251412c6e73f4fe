/// Trait for writing transcript lines to the console.
pub(crate) trait ConsoleWriter {
    fn cell(&mut self, position: usize, label: &str, summary: &str);
    fn exec_succeeded(&mut self, position: usize, command: &str, detail: &str);
    fn exec_failed(&mut self, position: usize, command: &str, detail: &str);
    fn collapsed_turn(&mut self, first: usize, last: usize, hidden: usize);
    fn side_effect(&mut self, title: &str, description: &str);
    fn totals(&mut self, cells: usize, events: usize, status: &str);
}

/// Generates both the ANSI and the plain writer from one table of formats.
macro_rules! console_writer_impl {
    (
        $StyledWriter:ident, $PlainWriter:ident, $out_field:ident,
        {
            $(
                fn $method:ident(&mut self, $($arg_name:ident: $arg_ty:ty),*) {
                    styled: $styled_fmt:expr,
                    plain: $plain_fmt:expr
                }
            )*
        }
    ) => {
        pub(crate) struct $StyledWriter<W: std::io::Write> {
            $out_field: W,
        }

        pub(crate) struct $PlainWriter<W: std::io::Write> {
            $out_field: W,
        }

        impl<W: std::io::Write> $StyledWriter<W> {
            pub(crate) fn new($out_field: W) -> Self {
                Self { $out_field }
            }
        }

        impl<W: std::io::Write> $PlainWriter<W> {
            pub(crate) fn new($out_field: W) -> Self {
                Self { $out_field }
            }
        }

        impl<W: std::io::Write> ConsoleWriter for $StyledWriter<W> {
            $(
                fn $method(&mut self, $($arg_name: $arg_ty),*) {
                    let _ = writeln!(self.$out_field, $styled_fmt, $($arg_name),*);
                }
            )*
        }

        impl<W: std::io::Write> ConsoleWriter for $PlainWriter<W> {
            $(
                fn $method(&mut self, $($arg_name: $arg_ty),*) {
                    let _ = writeln!(self.$out_field, $plain_fmt, $($arg_name),*);
                }
            )*
        }
    };
}

const BOLD: &str = "\x1b[1m";
const BOLD_RED: &str = "\x1b[1;31m";
const BOLD_GREEN: &str = "\x1b[1;32m";
const BOLD_YELLOW: &str = "\x1b[1;33m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

console_writer_impl!(
    AnsiConsoleWriter, PlainConsoleWriter, out, {
        fn cell(&mut self, position: usize, label: &str, summary: &str) {
            styled: "{DIM}[{}]{RESET} {BOLD}{}{RESET} {}",
            plain: "[{}] {} {}"
        }
        fn exec_succeeded(&mut self, position: usize, command: &str, detail: &str) {
            styled: "{DIM}[{}]{RESET} {BOLD_GREEN}exec {}{RESET} {DIM}{}{RESET}",
            plain: "[{}] exec {} succeeded {}"
        }
        fn exec_failed(&mut self, position: usize, command: &str, detail: &str) {
            styled: "{DIM}[{}]{RESET} {BOLD_RED}exec {}{RESET} {DIM}{}{RESET}",
            plain: "[{}] exec {} failed {}"
        }
        fn collapsed_turn(&mut self, first: usize, last: usize, hidden: usize) {
            styled: "{DIM}    cells {}..={} collapsed ({} hidden){RESET}",
            plain: "    cells {}..={} collapsed ({} hidden)"
        }
        fn side_effect(&mut self, title: &str, description: &str) {
            styled: "{BOLD_YELLOW}{}:{RESET} {}",
            plain: "{}: {}"
        }
        fn totals(&mut self, cells: usize, events: usize, status: &str) {
            styled: "{DIM}{} cells from {} events, status: {}{RESET}",
            plain: "{} cells from {} events, status: {}"
        }
    }
);
