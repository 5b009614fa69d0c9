use std::io::{BufRead, Write};

use anyhow::{Result, bail};
use histeq::BinCount;

/// Asks for a bin count until a valid one is entered.
///
/// Fails only when the input ends or cannot be read.
pub fn prompt_bin_count<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<BinCount> {
    let mut line = String::new();
    loop {
        writeln!(output, "Enter a bin number in range {}-{}", BinCount::MIN, BinCount::MAX)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            bail!("input closed before a bin count was entered");
        }

        let text = line.trim();
        if text.is_empty() {
            writeln!(output, "Please enter a number.")?;
            continue;
        }

        let Ok(value) = text.parse::<i64>() else {
            writeln!(output, "Please enter an integer.")?;
            continue;
        };

        match BinCount::try_from(value) {
            Ok(bins) => return Ok(bins),
            Err(_) => writeln!(
                output,
                "Please enter a number in range {}-{}.",
                BinCount::MIN,
                BinCount::MAX
            )?,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn run(input: &str) -> (Result<BinCount>, String) {
        let mut output = Vec::new();
        let result = prompt_bin_count(&mut Cursor::new(input), &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_valid_first_answer() {
        let (result, output) = run("64\n");
        assert_eq!(result.unwrap(), BinCount::new(64).unwrap());
        assert_eq!(output, "Enter a bin number in range 1-256\n");
    }

    #[test]
    fn test_reprompts_until_valid() {
        let (result, output) = run("\nabc\n2.5\n0\n257\n-3\n  16  \n");
        assert_eq!(result.unwrap(), BinCount::new(16).unwrap());

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            [
                "Enter a bin number in range 1-256",
                "Please enter a number.",
                "Enter a bin number in range 1-256",
                "Please enter an integer.",
                "Enter a bin number in range 1-256",
                "Please enter an integer.",
                "Enter a bin number in range 1-256",
                "Please enter a number in range 1-256.",
                "Enter a bin number in range 1-256",
                "Please enter a number in range 1-256.",
                "Enter a bin number in range 1-256",
                "Please enter a number in range 1-256.",
                "Enter a bin number in range 1-256",
            ]
        );
    }

    #[test]
    fn test_bounds_accepted() {
        assert_eq!(run("1\n").0.unwrap().get(), 1);
        assert_eq!(run("256").0.unwrap().get(), 256);
    }

    #[test]
    fn test_end_of_input_is_an_error() {
        let (result, output) = run("");
        assert!(result.is_err());
        assert_eq!(output, "Enter a bin number in range 1-256\n");

        assert!(run("x\n").0.is_err());
    }
}
