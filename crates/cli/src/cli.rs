use clap::{Parser, Subcommand};

/// Command-line reader for LMS course content.
#[derive(Debug, Parser)]
#[command(
    version,
    about = "Read LMS course content offline",
    long_about = "Reads cleaned, distraction-free LMS activity content.\n\
                  Content is kept in a local store so repeat reads need no network.\n\
                  Configuration comes from QUIRE_* environment variables or the TOML\n\
                  file named by QUIRE_CONFIG_FILE."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// LMS token, overriding QUIRE_LMS_TOKEN
    #[arg(long, global = true, env = "QUIRE_LMS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the cleaned HTML of one activity
    Read {
        /// Activity URL
        locator: String,
    },

    /// Show a course's sections and activities
    Course {
        course_id: i64,

        /// Refetch the structure from the LMS
        #[arg(long)]
        refresh: bool,
    },

    /// List enrolled courses
    Courses,

    /// Read a course's activities one after another
    Browse { course_id: i64 },

    /// Store activities locally ahead of reading them
    Prefetch {
        /// Activity URLs
        #[arg(required_unless_present = "course", conflicts_with = "course")]
        locators: Vec<String>,

        /// Prefetch every activity of this course
        #[arg(short, long)]
        course: Option<i64>,
    },

    /// Remove everything from the local store
    Clear {
        /// Also clear the shared server cache
        #[arg(long)]
        server_cache: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefetch_course() {
        let args = CliArgs::try_parse_from(["quire", "prefetch", "--course", "7", "-v"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Command::Prefetch { course: Some(7), .. }));
    }

    #[test]
    fn test_prefetch_needs_targets() {
        assert!(CliArgs::try_parse_from(["quire", "prefetch"]).is_err());
        assert!(CliArgs::try_parse_from(["quire", "prefetch", "a", "--course", "1"]).is_err());
    }

    #[test]
    fn test_parse_browse() {
        let args = CliArgs::try_parse_from(["quire", "browse", "12"]).unwrap();
        assert!(matches!(args.command, Command::Browse { course_id: 12 }));
    }

    #[test]
    fn test_parse_read() {
        let args = CliArgs::try_parse_from(["quire", "read", "https://lms/mod/page/view.php?id=1"]).unwrap();
        match args.command {
            Command::Read { locator } => assert!(locator.ends_with("id=1")),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
