use rand::Rng;
use rand::seq::SliceRandom;

const WORK: &[&str] = &[
    "Review quarterly reports",
    "Schedule team meeting for next week",
    "Update project documentation",
    "Send follow-up emails to clients",
    "Prepare presentation slides",
    "Complete code review",
    "Test new feature implementation",
    "Update database schemas",
    "Write unit tests for API endpoints",
    "Deploy staging environment",
];

const PERSONAL: &[&str] = &[
    "Buy groceries for the week",
    "Call dentist to schedule appointment",
    "Pick up dry cleaning",
    "Pay utility bills",
    "Exercise at the gym",
    "Read chapter 5 of current book",
    "Plan weekend trip",
    "Clean the house",
    "Water the plants",
    "Organize photo albums",
];

const MEETING: &[&str] = &[
    "Follow up on action items from meeting",
    "Research competitor analysis",
    "Draft proposal for new initiative",
    "Schedule one-on-one with team members",
    "Book conference room for next presentation",
    "Prepare agenda for weekly standup",
    "Review budget allocations",
    "Update project timeline",
    "Send meeting notes to stakeholders",
    "Plan sprint retrospective",
];

/// Picks the item list that best fits an image nobody could read.
pub fn themed_items(file_name: &str, hour: u32) -> &'static [&'static str] {
    let name = file_name.to_lowercase();
    if ["meeting", "whiteboard", "notes"].iter().any(|k| name.contains(k)) {
        MEETING
    } else if (9..=17).contains(&hour) {
        WORK
    } else {
        PERSONAL
    }
}

fn restyle<R: Rng + ?Sized>(item: &str, rng: &mut R) -> String {
    match rng.gen_range(0..7) {
        0 => format!("• {item}"),
        1 => format!("- {item}"),
        2 => format!("* {item}"),
        3 => format!("{}. {item}", rng.gen_range(1..=10)),
        4 => format!("□ {item}"),
        5 => format!("TODO: {item}"),
        _ => format!("TASK: {item}"),
    }
}

/// Stand-in note text used when the OCR engine fails: 3 to 6 themed
/// items in mixed list styles, one per line.
pub fn generate<R: Rng + ?Sized>(file_name: &str, hour: u32, rng: &mut R) -> String {
    let mut lines: Vec<String> = themed_items(file_name, hour)
        .iter()
        .map(|item| restyle(item, &mut *rng))
        .collect();
    lines.shuffle(rng);
    let keep = rng.gen_range(3..=6);
    lines.truncate(keep);
    lines.join("\n")
}
