//! Command line program for processing Vicsek parameter-study runs.

#![allow(unused)]

#[macro_use]
extern crate log;

extern crate anyhow;
extern crate clap;
extern crate colored;
extern crate linefeed;

extern crate vicsek_study_core as study;

pub mod cli;
pub mod prompt;

use colored::*;

fn main() {
    // Run the program based on user input
    match cli::start(cli::app().get_matches()) {
        Ok(_) => (),
        Err(e) => {
            println!("{}{}", "error: ".red(), e);
            if e.root_cause().to_string() != e.to_string() {
                println!("Caused by:\n{}", e.root_cause())
            }
            std::process::exit(1);
        }
    }
}
