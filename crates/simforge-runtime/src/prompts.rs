//! Stage prompt templates.
//!
//! Each builder renders the already-validated upstream artifacts into
//! the stage's instruction text. Every template demands JSON-only
//! output in the stage's wire shape; the extractor still tolerates
//! fenced and prose-wrapped responses because models routinely ignore
//! that demand.

/// Plan stage: specification in, blueprint JSON out.
pub fn plan_prompt(spec_json: &str) -> String {
    format!(
        r#"You are an expert planner for interactive, mobile-first educational simulations
aimed at 12-13 year old students.

Input specification:
{spec_json}

Create a pedagogically sound blueprint that prioritizes visual learning over text:
- Plan specific visual elements and smooth animations for state changes.
- Single-column vertical layout; everything fits a 360px-wide screen.
- At most 3 controllable variables, each with an intuitive range and clear visual feedback.
- Touch targets at least 48px with 8px spacing.

Respond with ONLY a JSON object of this shape (all fields present, lists never null):
{{
  "learning_objectives": ["..."],
  "key_concepts": ["..."],
  "variables_to_simulate": [
    {{"name": "...", "control": "slider", "min": 0, "max": 100, "default": 50, "unit": "..."}}
  ],
  "user_interactions": {{"sliders": ["..."], "buttons": ["..."], "other": "..."}},
  "simulation_logic": ["Step 1: ...", "Step 2: ..."],
  "mobile_ui_plan": {{"layout": "vertical single column", "sections": ["..."], "touch_targets": "minimum 48px"}},
  "misconceptions_to_address": ["..."],
  "text_instructions": "One sentence, max 15 words",
  "safety_constraints": ["Age-appropriate content", "No external resources"]
}}

NO markdown code fences, NO commentary, valid JSON only."#
    )
}

/// Creation stage: blueprint in, self-contained document out.
pub fn create_prompt(plan_json: &str) -> String {
    format!(
        r#"You are an expert generator of self-contained, mobile-first HTML simulations.

Blueprint:
{plan_json}

Produce a COMPLETE single-file HTML document implementing the blueprint exactly:
- Starts with <!DOCTYPE html>; includes <html>, <head> with charset and viewport
  meta, embedded <style>, and a <script> with vanilla JavaScript only.
- No external resources, CDNs or libraries of any kind.
- Visuals via inline SVG or CSS shapes, centered with flexbox; smooth
  transitions on every interaction.
- Sliders full-width with 44px height; buttons at least 48px tall;
  body text at least 16px.
- Event listeners via addEventListener, never inline handlers.

Respond with ONLY a JSON object:
{{"index.html": "<!DOCTYPE html>... the entire document as one string ..."}}

NO markdown code fences, NO commentary, valid JSON only."#
    )
}

/// Fix stage: current document in, corrected document plus explanations out.
pub fn fix_prompt(html: &str) -> String {
    format!(
        r#"You are a senior HTML/CSS/JS debugger for mobile-responsive simulations.

Input document:
{html}

Systematically fix, in priority order:
1. Structure: DOCTYPE present, viewport meta present, all tags closed and nested properly.
2. Layout: visual area has explicit height, visuals centered with flexbox,
   no horizontal scrolling at 360px width.
3. Mobile: touch targets >= 48px, fonts >= 16px.
4. JavaScript: listeners attached, no undefined references, null checks before
   DOM access.

Respond with ONLY a JSON object:
{{
  "fixed": true,
  "index.html": "... the complete corrected document ...",
  "explanations": ["what was fixed", "..."]
}}

NO markdown code fences, NO commentary, valid JSON only."#
    )
}

/// Learning-materials stage: specification and blueprint in, question set out.
pub fn interact_prompt(spec_json: &str, plan_json: &str) -> String {
    format!(
        r#"You are an educational content designer writing for 12-13 year old students.

Specification:
{spec_json}

Blueprint:
{plan_json}

Create exactly 3 multiple-choice questions tied to the simulation: one
observation question, one prediction question, one real-world application
question. Each has 4 options of similar length, one clearly correct answer,
plausible distractors drawn from common misconceptions, and a hint that guides
without revealing.

Respond with ONLY a JSON object:
{{
  "intro": "2-3 friendly sentences encouraging exploration",
  "questions": [
    {{"question": "...?", "options": ["A) ...", "B) ...", "C) ...", "D) ..."],
      "correct_index": 0, "hint": "...", "explanation": "..."}}
  ],
  "followups": ["..."],
  "summary": "2-3 sentence recap"
}}

NO markdown code fences, NO commentary, valid JSON only."#
    )
}

/// Feedback-incorporation stage: current document plus feedback in,
/// revised document out.
pub fn feedback_prompt(html: &str, feedback: &str) -> String {
    format!(
        r#"You are a simulation improvement specialist.

Current document:
{html}

Feedback to apply:
{feedback}

Apply the requested improvements with targeted modifications. Preserve working
functionality, keep the file self-contained and keep the mobile-first layout
intact.

Respond with ONLY a JSON object:
{{
  "index.html": "... the complete improved document ...",
  "changes_made": ["each change, one per entry"]
}}

NO markdown code fences, NO commentary, valid JSON only."#
    )
}

/// Review stage: final document in, scored review out.
pub fn review_prompt(html: &str) -> String {
    format!(
        r#"You are a strict quality reviewer of interactive educational simulations
for 12-13 year old students.

Document under review:
{html}

Score each criterion 0-5 (5 = excellent, 3 = acceptable, below 3 = failing):
- pedagogical_clarity: objectives evident, presentation fits the age group
- conceptual_correctness: scientifically accurate, acceptable simplifications only
- mobile_responsiveness: viewport meta, fits 360px, touch targets >= 48px
- interactivity_quality: immediate feedback, smooth animations, engaging
- code_reliability: no JS errors, proper event handling, self-contained
- safety_age_appropriateness: suitable content, no external links

Respond with ONLY a JSON object:
{{
  "scores": {{
    "pedagogical_clarity": 0,
    "conceptual_correctness": 0,
    "mobile_responsiveness": 0,
    "interactivity_quality": 0,
    "code_reliability": 0,
    "safety_age_appropriateness": 0
  }},
  "strengths": ["..."],
  "required_changes": ["actionable change", "..."],
  "optional_improvements": ["..."],
  "return_to": "none | fix | create | plan"
}}

Use "return_to": "fix" for minor technical issues, "create" for a needed
redesign, "plan" for fundamental concept problems, "none" when approved.
NO markdown code fences, NO commentary, valid JSON only."#
    )
}
