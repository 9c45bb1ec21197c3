//! Human-facing progress report on stdout.
//!
//! Diagnostics go through `tracing` (stderr); this module only prints what
//! the operator watches: banners, the queue, results and the artifact.

use std::path::Path;

use console::{style, Style};

use crate::task::{Task, TaskQueue};

fn banner(title: &str, color: Style) {
    println!();
    println!("{}", color.bold().apply_to(format!("*****{}*****", title)));
    println!();
}

pub fn env_file(path: &Path) {
    println!("Using env from file: {}", path.display());
}

pub fn objective(objective: &str) {
    banner("OBJECTIVE", Style::new().cyan());
    println!("{}", objective);
}

pub fn expensive_model_warning(model: &str) {
    println!(
        "{}",
        style(format!(
            "*****USING {}. POTENTIALLY EXPENSIVE. MONITOR YOUR COSTS*****",
            model.to_uppercase()
        ))
        .red()
        .bold()
    );
}

pub fn task_list(queue: &TaskQueue) {
    banner("TASK LIST", Style::new().magenta());
    for task in queue.iter() {
        println!("{}", task);
    }
}

pub fn next_task(task: &Task) {
    banner("NEXT TASK", Style::new().green());
    println!("{}", task);
}

pub fn subtasks(task: &Task, subtasks: &[Task]) {
    banner("REFINED TASK", Style::new().green());
    println!("{}", task);
    for subtask in subtasks {
        println!("  {}", style(subtask).dim());
    }
}

pub fn task_result(result: &str) {
    banner("TASK RESULT", Style::new().yellow());
    println!("{}", result);
}

pub fn artifact(artifact: &str) {
    banner("ARTIFACT", Style::new().blue());
    println!("{}", artifact);
}

pub fn goals(goals: &[String]) {
    banner("GOALS", Style::new().blue());
    for goal in goals {
        println!("{}", goal);
    }
}

pub fn not_done(missing: &str) {
    println!(
        "{}",
        style(format!("Not yet done, still need to achieve these goals: {}", missing)).blue()
    );
}

pub fn done() {
    banner("DONE", Style::new().blue());
}

pub fn final_artifact(artifact: &str) {
    banner("FINAL ARTIFACT", Style::new().blue());
    println!("{}", artifact);
}
