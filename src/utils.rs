//! Some utility functions

use std::io::Write;

use crate::view::{BoardView, SectionView, TaskView};

/// Write a board the way the terminal client shows it
pub fn write_board<W: Write>(out: &mut W, board: &BoardView) -> std::io::Result<()> {
    for section in board.sections().iter() {
        write_section(out, section)?;
    }
    Ok(())
}

fn write_section<W: Write>(out: &mut W, section: &SectionView) -> std::io::Result<()> {
    if section.visible == false {
        return Ok(());
    }
    writeln!(out, "== {} ({})", section.title, section.tasks.len())?;
    for task in &section.tasks {
        write_task(out, task)?;
    }
    if let Some(placeholder) = &section.placeholder {
        writeln!(out, "    {}", placeholder)?;
    }
    Ok(())
}

fn write_task<W: Write>(out: &mut W, task: &TaskView) -> std::io::Result<()> {
    let origin = if task.is_external { "@" } else if task.is_scheduled { "=" } else { " " };
    let time = task.time_label.as_deref().unwrap_or("             ");
    writeln!(out, "  {} {}  {}\t{}", origin, time, task.title, task.id)?;
    if let Some(question) = &task.question {
        writeln!(out, "        ? {}", question)?;
    }
    Ok(())
}

/// A debug utility that pretty-prints a board to stdout
pub fn print_board(board: &BoardView) {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    if let Err(err) = write_board(&mut lock, board) {
        log::warn!("Unable to print the board: {}", err);
    }
}
