use super::models::{SkillLevel, TaskStatus, TaskSummary};

/// Mentor persona wrapped around a single chat message.
pub fn chat_prompt(message: &str) -> String {
    format!(
        r#"
You are an AI Career Mentor for youth. You provide supportive, encouraging guidance on:
- Career path recommendations
- Skill development advice
- Learning resource suggestions
- Motivation and goal setting

User message: "{message}"

Respond in a friendly, supportive tone. Keep responses concise but helpful.
"#
    )
}

pub fn roadmap_prompt(skill: &str, level: SkillLevel) -> String {
    let level = level.as_str();
    format!(
        r#"
Create a detailed learning roadmap for "{skill}" at {level} level.

Return a JSON object with this structure:
{{
  "title": "skill name",
  "description": "brief description",
  "estimatedDuration": "time estimate",
  "levels": [
    {{
      "title": "level name",
      "description": "what you'll learn",
      "estimatedHours": number,
      "tasks": [
        {{
          "title": "task name",
          "description": "what to do",
          "estimatedHours": number,
          "resources": [
            {{
              "title": "resource name",
              "type": "video|article|course|book|project",
              "url": "example.com",
              "description": "why this resource",
              "duration": "time needed"
            }}
          ]
        }}
      ]
    }}
  ]
}}

Make it practical, actionable, and include real resources when possible.
"#
    )
}

pub fn quote_prompt() -> &'static str {
    r#"
Generate a motivational quote for young people pursuing their careers and learning new skills.
Make it inspiring, relevant to career development, and encouraging.
Return just the quote text, nothing else.
"#
}

pub fn progress_prompt(tasks: &[TaskSummary], streak_days: u32) -> String {
    let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
    let completed = count(TaskStatus::Completed);
    let pending = count(TaskStatus::Pending);
    let in_progress = count(TaskStatus::InProgress);

    format!(
        r#"
Analyze this user's learning progress and provide encouraging insights:

Completed Tasks: {completed}
Pending Tasks: {pending}
In Progress: {in_progress}
Current Streak: {streak_days} days

Provide a brief, encouraging analysis with specific suggestions for improvement.
Keep it positive and actionable.
"#
    )
}

pub fn next_steps_prompt(roadmaps: &[String], completed_tasks: usize) -> String {
    let roadmaps = roadmaps.join(", ");
    format!(
        r#"
Based on current roadmaps ({roadmaps}) and {completed_tasks} completed tasks,
suggest 3-5 next actionable steps for continued learning.

Return as a JSON array of strings.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_prompt_quotes_message() {
        let p = chat_prompt("How do I start with Rust?");
        assert!(p.contains(r#"User message: "How do I start with Rust?""#));
        assert!(p.contains("AI Career Mentor"));
    }

    #[test]
    fn roadmap_prompt_embeds_skill_and_level() {
        let p = roadmap_prompt("Data Science", SkillLevel::Intermediate);
        assert!(p.contains(r#"roadmap for "Data Science" at intermediate level"#));
        assert!(p.contains(r#""estimatedDuration": "time estimate""#));
    }

    #[test]
    fn progress_prompt_counts_by_status() {
        let tasks = vec![
            TaskSummary { title: "a".into(), status: TaskStatus::Completed },
            TaskSummary { title: "b".into(), status: TaskStatus::Completed },
            TaskSummary { title: "c".into(), status: TaskStatus::Pending },
            TaskSummary { title: "d".into(), status: TaskStatus::InProgress },
        ];
        let p = progress_prompt(&tasks, 7);
        assert!(p.contains("Completed Tasks: 2"));
        assert!(p.contains("Pending Tasks: 1"));
        assert!(p.contains("In Progress: 1"));
        assert!(p.contains("Current Streak: 7 days"));
    }

    #[test]
    fn next_steps_prompt_lists_roadmaps() {
        let p = next_steps_prompt(&["Web Dev".into(), "SQL".into()], 4);
        assert!(p.contains("(Web Dev, SQL) and 4 completed tasks"));
    }
}
