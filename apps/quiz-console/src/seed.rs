//! Starter question bank for a fresh database.

/// (question, correct answer, wrong answer, wrong answer)
pub type SampleQuestion = (&'static str, &'static str, &'static str, &'static str);

pub const SAMPLE_BANK: &[(&str, &[SampleQuestion])] = &[
    (
        "Geography",
        &[
            ("What is the capital of France?", "Paris", "Lyon", "Nice"),
            ("Which is the longest river in Africa?", "Nile", "Congo", "Niger"),
            ("On which continent is Mongolia?", "Asia", "Europe", "Africa"),
            ("What is the capital of Australia?", "Canberra", "Sydney", "Melbourne"),
            ("Which ocean lies east of Brazil?", "Atlantic", "Pacific", "Indian"),
            ("Which country has the most natural lakes?", "Canada", "Finland", "Russia"),
        ],
    ),
    (
        "Science",
        &[
            ("What is the chemical symbol for gold?", "Au", "Ag", "Gd"),
            ("How many planets are in the Solar System?", "8", "9", "7"),
            ("What gas do plants absorb from the air?", "Carbon dioxide", "Oxygen", "Nitrogen"),
            ("What is the boiling point of water at sea level in Celsius?", "100", "90", "120"),
            ("Which particle has a negative charge?", "Electron", "Proton", "Neutron"),
            ("What is the hardest natural substance?", "Diamond", "Quartz", "Granite"),
        ],
    ),
    (
        "History",
        &[
            ("In which year did the Berlin Wall fall?", "1989", "1991", "1987"),
            ("Who was the first person to walk on the Moon?", "Neil Armstrong", "Buzz Aldrin", "Yuri Gagarin"),
            ("Which empire built Machu Picchu?", "Inca", "Aztec", "Maya"),
            ("In which year did World War I begin?", "1914", "1918", "1939"),
            ("Which ship sank on its maiden voyage in 1912?", "Titanic", "Lusitania", "Britannic"),
        ],
    ),
    (
        "Computing",
        &[
            ("What does CPU stand for?", "Central Processing Unit", "Central Program Utility", "Core Processing Unit"),
            ("How many bits are in a byte?", "8", "16", "4"),
            ("Which language is the Linux kernel mostly written in?", "C", "Rust", "Go"),
            ("What does SQL stand for?", "Structured Query Language", "Simple Query Language", "Sequential Query Logic"),
            ("Which number system uses only 0 and 1?", "Binary", "Octal", "Decimal"),
        ],
    ),
];
