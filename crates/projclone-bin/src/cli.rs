use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "projclone")]
#[command(version)]
#[command(about = "Clone a project directory while renaming it")]
#[command(long_about = "Copies a directory tree to a new location, replacing a list of names \
    in directory names, file names and text file contents. Replacements are applied in \
    the order given, each one working on the output of the previous one.")]
#[command(after_help = "Examples:\n  \
    projclone /old/proj /new/proj oldname newname\n  \
    projclone /old/proj /new/proj \"old1,old2\" \"new1,new2\"\n  \
    projclone /companyA/projX /companyB/projY \"companyA,projX\" \"companyB,projY\"")]
pub struct Cli {
    #[arg(help = "Project directory to clone")]
    pub source_dir: PathBuf,

    #[arg(help = "Parent directory of the clone, or the clone directory itself")]
    pub dest_dir: PathBuf,

    #[arg(help = "Comma-separated names to replace (e.g. 'old1,old2')")]
    pub source_names: String,

    #[arg(help = "Comma-separated replacement names, one per source name")]
    pub dest_names: String,

    #[arg(short, long, env = "PROJCLONE_ASSUME_YES", help = "Overwrite an existing destination without asking")]
    pub yes: bool,

    #[arg(long, help = "Show where each entry would be copied without writing anything")]
    pub preview: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}
