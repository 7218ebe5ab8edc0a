pub mod table;
pub mod json;

use crate::catalog::FileRecord;
use crate::config::Config;
use crate::engine::JobResult;

pub fn print(results: &[JobResult], config: &Config) {
    if config.json_output {
        println!("{}", json::render(results));
    } else {
        print!("{}", table::render(results));
        print_errors(results);
    }
}

pub fn print_records(records: &[FileRecord], json_output: bool) {
    if json_output {
        println!("{}", json::render_records(records));
    } else {
        print!("{}", table::render_records(records));
    }
}

fn print_errors(results: &[JobResult]) {
    let failed: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
    if failed.is_empty() {
        return;
    }

    eprintln!("\nerrors encountered:");
    for result in failed {
        for error in &result.errors {
            eprintln!("  {}: {error}", result.job);
        }
    }
}
