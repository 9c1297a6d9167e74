pub mod dualcert_framework {
    pub mod dualcert_command;
}
pub mod dualcert_commands {
    pub mod dualcert_command_algorithms;
    pub mod dualcert_command_knapsack;
    pub mod dualcert_command_search;
    pub mod dualcert_command_verify;
}
pub mod dual {
    pub mod dual_lp;
    pub mod feasibility_loop;
    pub mod outcome;
    pub mod parameters;
    pub mod search;
    pub mod type_info;
    pub mod verify;
}
pub mod knapsack {
    pub mod knapsack_instance;
    pub mod knapsack_solver;
    pub mod pattern;
    pub mod pattern_check;
}
pub mod math {
    pub mod fraction;
    pub mod traits;
}
