use crate::context::{self, print_json};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut dash = context::open()?;
    let outcome = dash.force_end_of_day()?;
    context::save(&mut dash)?;
    print_json(&outcome)
}
