/// Substitutes `{name}` placeholders in one pass, so substituted values are never re-expanded.
/// Unknown placeholders are kept verbatim.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
	let mut out = String::with_capacity(template.len());
	let mut rest = template;

	while let Some(start) = rest.find('{') {
		out.push_str(&rest[..start]);

		let tail = &rest[start + 1..];
		let var = vars
			.iter()
			.find(|(name, _)| tail.starts_with(*name) && tail[name.len()..].starts_with('}'));

		match var {
			Some((name, value)) => {
				out.push_str(value);

				rest = &tail[name.len() + 1..];
			},
			None => {
				out.push('{');

				rest = tail;
			},
		}
	}

	out.push_str(rest);

	out
}
