use injectscope_core::Results;

pub fn print_results(results: &Results) {
    print!("{}", results.render());
}
