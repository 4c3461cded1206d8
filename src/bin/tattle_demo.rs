//! Demonstration runner.
//!
//! Registers a handful of sample cases and hands control to the CLI, so the
//! engine can be exercised end to end:
//!
//! ```text
//! tattle-demo --list-tests
//! tattle-demo '[math]' --tags
//! tattle-demo --reporter json
//! ```

use tattle::matchers::{contains_substring, is_any_of};
use tattle::{capture, check, check_that, cli, info, require, section, skip, test_case};

fn main() {
    cli::run(|registry| {
        test_case!(registry, "integer arithmetic stays exact", "[math]", {
            let sum: i32 = (1..=10).sum();
            check!(sum == 55);
            require!(sum % 5 == 0);
        });

        test_case!(registry, "greetings carry the recipient", "[strings]", {
            let greeting = String::from("hello, world");
            check_that!(greeting.as_str(), contains_substring("world"));
            check!(greeting.len() > 5);
        });

        test_case!(registry, "sections fork one setup", "[sections]", {
            let mut values = vec![1, 2, 3];
            section!("reversing", {
                values.reverse();
                check!(values[0] == 3);
            });
            section!("pushing", {
                values.push(4);
                require!(values.len() == 4);
                check!(values[3] == 4);
            });
        });

        test_case!(registry, "captures annotate failures", "[.][demo-failure]", {
            for i in 0..3 {
                capture!(i);
                check!(i != 2);
            }
        });

        test_case!(registry, "dice rolls stay in range", "[math]", {
            let roll = 4;
            info!("rolled ", roll);
            check_that!(roll, is_any_of([1, 2, 3, 4, 5, 6]));
        });

        test_case!(registry, "network probes are skipped offline", "[net]", {
            skip!("no network in the demo environment");
        });
    });
}
