//! Interactive credential collection

use std::io::{self, BufRead, Write};

use statcast_loader::Credentials;

/// Ask for a user name, then for that user's password
///
/// Reads whole lines from `input`; surrounding whitespace is trimmed from
/// the user name but the password is taken as typed.
pub fn prompt_credentials<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> io::Result<Credentials> {
    writeln!(output, "enter PSQL username:")?;
    output.flush()?;
    let user = read_line(input)?.trim().to_string();

    writeln!(output, "enter password for {}:", user)?;
    output.flush()?;
    let password = read_line(input)?;

    Ok(Credentials::new(user, password))
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before credentials were entered",
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
