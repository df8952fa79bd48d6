use crate::models::{HabitCard, MissedPrompt, SyncMode};
use crate::streak::date_key;
use chrono::NaiveDate;

pub fn render_index(
    today: NaiveDate,
    mode: SyncMode,
    cards: &[HabitCard],
    missed: Option<&MissedPrompt>,
    error: Option<&str>,
) -> String {
    let mode_label = match mode {
        SyncMode::Local => "Local",
        SyncMode::Cloud => "Cloud",
    };

    let habits = if cards.is_empty() {
        r#"<p class="empty">No habits yet! Create your first habit to start tracking.</p>"#
            .to_string()
    } else {
        cards.iter().map(render_card).collect::<Vec<_>>().join("\n")
    };

    let error = error
        .map(|message| format!(r#"<p class="error">{}</p>"#, escape(message)))
        .unwrap_or_default();

    INDEX_HTML
        .replace("{{DATE}}", &date_key(today))
        .replace("{{MODE}}", mode_label)
        .replace("{{ERROR}}", &error)
        .replace("{{MISSED}}", &missed.map(render_missed).unwrap_or_default())
        .replace("{{HABITS}}", &habits)
}

fn render_card(card: &HabitCard) -> String {
    let habit = &card.habit;
    let badge = card
        .category
        .as_ref()
        .map(|c| format!(r#"<span class="badge">{}</span>"#, escape(&c.name)))
        .unwrap_or_default();

    let cells: String = card
        .cells
        .iter()
        .map(|cell| {
            let state = if cell.completed { "done" } else { "" };
            let mark = if cell.completed {
                "&#10003;".to_string()
            } else {
                cell.cell.day_label.clone()
            };
            let button = if cell.cell.is_today {
                format!(
                    r#"<form method="post" action="/habits/{id}/toggle"><input type="hidden" name="date" value="{key}" /><button class="dot {state}" title="Click to toggle completion">{mark}</button></form>"#,
                    id = escape(&habit.id),
                    key = cell.cell.key,
                )
            } else {
                format!(
                    r#"<button class="dot {state}" disabled title="Only today's habits can be edited">{mark}</button>"#
                )
            };
            format!(
                r#"<div class="cell"><span class="label">{}</span>{button}</div>"#,
                cell.cell.label
            )
        })
        .collect();

    format!(
        r#"<article class="card">
  <header><h2>{name}</h2>{badge}<span class="streak">Streak: {streak}</span></header>
  <div class="cells">{cells}</div>
</article>"#,
        name = escape(&habit.name),
        streak = card.streak,
    )
}

fn render_missed(prompt: &MissedPrompt) -> String {
    let items: String = prompt
        .habits
        .iter()
        .map(|habit| {
            let done = prompt.statuses.get(&habit.id).copied().unwrap_or(false);
            format!(
                "<li>{} &mdash; {}</li>",
                escape(&habit.name),
                if done { "done" } else { "not done" }
            )
        })
        .collect();

    format!(
        r#"<section class="missed"><h2>Update {date}</h2><p>{count} habit(s) were not filled in.</p><ul>{items}</ul></section>"#,
        date = date_key(prompt.date),
        count = prompt.habits.len(),
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Habit Tracker</title>
  <style>
    :root {
      --bg: #f8f3e6;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      justify-items: center;
      padding: 32px 18px 48px;
    }

    main {
      width: min(860px, 100%);
      display: grid;
      gap: 20px;
    }

    .subtitle {
      margin: 0;
      color: #5f5c57;
    }

    .card, .missed, form.create {
      background: var(--card);
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    .card header {
      display: flex;
      align-items: center;
      gap: 10px;
    }

    .card h2 {
      margin: 0;
      font-size: 1.2rem;
      flex: 1;
    }

    .badge, .streak {
      font-size: 0.8rem;
      border-radius: 999px;
      padding: 4px 10px;
      border: 1px solid var(--accent-2);
    }

    .cells {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 6px;
      margin-top: 12px;
    }

    .cell {
      display: grid;
      justify-items: center;
      gap: 4px;
      font-size: 0.75rem;
    }

    .dot {
      width: 34px;
      height: 34px;
      border-radius: 50%;
      border: none;
      background: #ece6da;
      cursor: pointer;
    }

    .dot.done {
      background: var(--accent);
      color: white;
    }

    .dot:disabled {
      cursor: not-allowed;
      opacity: 0.7;
    }

    .error {
      color: #b3261e;
    }
  </style>
</head>
<body>
  <main>
    <header>
      <h1>Habit Tracker</h1>
      <p class="subtitle">{{DATE}} &middot; {{MODE}} mode</p>
      {{ERROR}}
    </header>
    {{MISSED}}
    <form class="create" method="post" action="/habits">
      <label>Habit name (one per line)<br /><textarea name="name" rows="3" required></textarea></label><br />
      <label>Description <input name="description" /></label>
      <label>Frequency
        <select name="frequency">
          <option value="daily">Daily</option>
          <option value="weekly">Weekly</option>
          <option value="monthly">Monthly</option>
        </select>
      </label>
      <button type="submit">Add habit</button>
    </form>
    {{HABITS}}
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;
    use crate::store::tests::habit;
    use crate::streak::build_card;

    #[test]
    fn only_today_cell_is_a_form() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        let mut habit = habit("h1", None, Frequency::Daily);
        habit.name = "<Run>".into();
        let card = build_card(&habit, None, &[], today);

        let html = render_index(today, SyncMode::Local, &[card], None, None);
        assert_eq!(html.matches(r#"action="/habits/h1/toggle""#).count(), 1);
        assert_eq!(html.matches(" disabled title").count(), 6);
        assert!(html.contains("&lt;Run&gt;"));
        assert!(html.contains("Local mode"));
    }
}
