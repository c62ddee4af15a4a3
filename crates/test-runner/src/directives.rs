/// Settings read from the `// @...` comment header of a fixture.
#[derive(Debug, Default, Clone)]
pub struct Directives {
    pub mode: Mode,
    pub expect: ExpectedResult,
    pub match_exact: Option<String>,
    pub contains: Vec<String>,
    pub skip: Option<String>,
}

impl Directives {
    pub fn new(src: &str) -> Result<Self, String> {
        let mut directives = Self::default();

        let mut is_match_block = false;
        let mut match_block_lines = vec![];

        for line in src.lines() {
            let trimmed = line.trim_end();

            // directives live in the leading comment block, the program starts after it
            let Some(comment) = trimmed.trim_start().strip_prefix("//") else {
                if trimmed.trim().is_empty() && !is_match_block {
                    continue;
                }
                break;
            };

            match comment.trim() {
                "@match-begin" => {
                    is_match_block = true;
                    continue;
                }
                "@match-end" => {
                    is_match_block = false;
                    continue;
                }
                _ => {}
            }

            if is_match_block {
                // keep the indentation of the expected line
                match_block_lines.push(comment.strip_prefix(' ').unwrap_or(comment));
                continue;
            }

            let comment = comment.trim();
            if let Some(ln) = comment.strip_prefix("@skip:") {
                directives.skip = Some(ln.trim().to_string());
            }
            if let Some(ln) = comment.strip_prefix("@mode:") {
                directives.mode = Mode::from_str(ln.trim())?;
            }
            if let Some(ln) = comment.strip_prefix("@expect:") {
                directives.expect = ExpectedResult::from_str(ln.trim())?;
            }
            if let Some(ln) = comment.strip_prefix("@match:") {
                directives.match_exact = Some(ln.trim().to_string());
            }
            if let Some(ln) = comment.strip_prefix("@contains:") {
                directives.contains.push(ln.trim().to_string());
            }
        }

        if is_match_block {
            return Err("Unterminated @match-begin block".to_string());
        }
        if !match_block_lines.is_empty() {
            directives.match_exact = Some(match_block_lines.join("\n"));
        }

        Ok(directives)
    }
}

/// Which `portupy` subcommand runs the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Mode {
    #[default]
    Build,
    Check,
}

impl Mode {
    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "build" => Ok(Self::Build),
            "check" => Ok(Self::Check),
            _ => Err(format!("Invalid mode: {}", s)),
        }
    }

    pub fn args(self) -> &'static [&'static str] {
        match self {
            Self::Build => &["build", "--stdout"],
            Self::Check => &["check"],
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Check => write!(f, "check"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedResult {
    #[default]
    Success,
    Error,
}

impl ExpectedResult {
    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid expected result: {}", s)),
        }
    }
}

impl std::fmt::Display for ExpectedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_successful_build() {
        let d = Directives::new("programa escreva 1; fimprog").unwrap();
        assert_eq!(d.mode, Mode::Build);
        assert_eq!(d.expect, ExpectedResult::Success);
        assert!(d.match_exact.is_none());
    }

    #[test]
    fn reads_header_directives() {
        let src = "// @mode: check\n// @expect: error\n// @contains: undeclared\n// @contains: line 5\nprograma\n// @skip: not a header\nfimprog";
        let d = Directives::new(src).unwrap();
        assert_eq!(d.mode, Mode::Check);
        assert_eq!(d.expect, ExpectedResult::Error);
        assert_eq!(d.contains, vec!["undeclared", "line 5"]);
        assert!(d.skip.is_none());
    }

    #[test]
    fn match_block_keeps_indentation() {
        let src = "// @match-begin\n// while (i < 3):\n//     print(i)\n// @match-end\nprograma";
        let d = Directives::new(src).unwrap();
        assert_eq!(d.match_exact.as_deref(), Some("while (i < 3):\n    print(i)"));
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(Directives::new("// @mode: run").is_err());
        assert!(Directives::new("// @expect: timeout").is_err());
        assert!(Directives::new("// @match-begin\n// x = 0\nprograma").is_err());
    }
}
