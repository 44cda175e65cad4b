//! Static prompt catalog.
//!
//! Each entry pairs the prompt the majority sees with the one the spy sees.
//! Questions are chosen so the spy's honest answer sounds odd to everyone
//! else; word pairs are near neighbours that survive vague descriptions.

use codeword_core::rng::{DeterministicRng, pick_index};

use super::model::PromptKind;

/// One majority/impostor prompt pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptPair {
    /// Prompt for locals, tourists' neighbours, and the joker.
    pub majority: &'static str,
    /// Prompt for the spy.
    pub impostor: &'static str,
    /// Word or question.
    pub kind: PromptKind,
}

const fn question(majority: &'static str, impostor: &'static str) -> PromptPair {
    PromptPair {
        majority,
        impostor,
        kind: PromptKind::Question,
    }
}

const fn word(majority: &'static str, impostor: &'static str) -> PromptPair {
    PromptPair {
        majority,
        impostor,
        kind: PromptKind::Word,
    }
}

/// The full catalog, in a fixed order so indices are stable.
pub const PROMPTS: &[PromptPair] = &[
    question("Describe your ex in one word.", "Describe your grandmother in one word."),
    question(
        "What is the first thing you notice in a potential partner?",
        "What is the first thing you look for in a public restroom?",
    ),
    question("Who is the most annoying person you know?", "Who is the holiest person you know?"),
    question(
        "What would you do if your crush confessed to you?",
        "What would you do if a kidnapper grabbed you?",
    ),
    question("How do you flirt?", "How do you scare away a stray dog?"),
    question("What do you say during an awkward silence?", "What do you moan during a massage?"),
    question("What is your red flag?", "What is your favorite color?"),
    question("Why did you cry last time?", "Why did you laugh last time?"),
    question(
        "What do you want to do on your wedding night?",
        "What do you want to do at a funeral?",
    ),
    question("What body part do you wash first?", "What body part do you rarely wash?"),
    question(
        "What does your breath smell like in the morning?",
        "What does your favorite flower smell like?",
    ),
    question(
        "Where is the worst place to have an itch?",
        "Where is the best place to get a tattoo?",
    ),
    question("What does earwax taste like?", "What does cheese taste like?"),
    question(
        "How often do you change your underwear?",
        "How often do you celebrate your birthday?",
    ),
    question("What do you use to clean your ears?", "What do you use to eat spaghetti?"),
    question("Describe the smell of a fart.", "Describe the smell of a bakery."),
    question("Show me your 'holding in a poop' face.", "Show me your 'winning the lottery' face."),
    question("What do you do with a booger?", "What do you do with a diamond?"),
    question(
        "What is the weirdest thing you've eaten?",
        "What is the most delicious thing you've eaten?",
    ),
    question("What do you eat when you're sad?", "What do you feed a stray cat?"),
    question("What does a rotten egg smell like?", "What does expensive perfume smell like?"),
    question("What is your favorite alcoholic drink?", "What is your favorite cleaning fluid?"),
    question("How do you eat pizza?", "How do you fold a fitted sheet?"),
    question("What is the worst pizza topping?", "What is the best ice cream flavor?"),
    question("Describe the texture of a raw oyster.", "Describe the texture of a fluffy pillow."),
    question("What do you usually do alone in your room?", "What do you usually do at church?"),
    question("What do you do when you see a ghost?", "What do you do when you see a cute baby?"),
    question("How do you kill a cockroach?", "How do you pet a puppy?"),
    question(
        "What would you do if you were naked in public?",
        "What would you do if you won a million dollars?",
    ),
    question("How do you beg for forgiveness?", "How do you order at Jollibee?"),
    question(
        "What sound do you make when you are in pain?",
        "What sound do you make when you are excited?",
    ),
    question("What is the best way to hide a body?", "What is the best way to wrap a gift?"),
    question("What do you say to a police officer?", "What do you say to a priest?"),
    question("Act like a monkey.", "Act like a supermodel."),
    question("Mime smoking a cigarette.", "Mime eating a banana."),
    question(
        "Where is the dirtiest place in your house?",
        "Where is the holiest place in your house?",
    ),
    question(
        "What object would you use to hit a burglar?",
        "What object would you use to comb your hair?",
    ),
    question("What is under your bed?", "What is in your wallet?"),
    question(
        "What is the most useless thing you own?",
        "What is the most expensive thing you own?",
    ),
    question("Where do you go to cry?", "Where do you go to party?"),
    question("What does a public toilet look like?", "What does a 5-star hotel look like?"),
    question("What do you say to the jeepney driver?", "What do you say to your crush?"),
    question("What is your favorite pulutan?", "What is your favorite breakfast?"),
    question("Describe the smell of durian.", "Describe the smell of sampaguita."),
    question(
        "What do you do when the National Anthem plays?",
        "What do you do when 'Budots' plays?",
    ),
    question("Who is the most famous Filipino?", "Who is the most hated Filipino?"),
    question("What do you bring to a potluck?", "What do you steal from a hotel?"),
    question("What happens in a telenovela?", "What happens in a horror movie?"),
    question("What is the scariest Filipino monster?", "What is the cutest Filipino celebrity?"),
    question("How do you point at something (Pinoy style)?", "How do you punch someone?"),
    question("What is your spirit animal?", "What is your favorite food?"),
    question("If you were a color, what would you be?", "If you were a smell, what would you be?"),
    question("What is the meaning of life?", "What is the password to your phone?"),
    question("What sound does a cow make?", "What sound does a cat make?"),
    question("How high can you jump?", "How loud can you scream?"),
    question("Make a scary face.", "Make a sexy face."),
    question("What is your biggest fear?", "What is your favorite hobby?"),
    question("How do you sleep at night?", "How do you dance in the club?"),
    question("What does rain sound like?", "What does a bomb explosion sound like?"),
    question("What’s the last lie you told?", "What’s the last movie you watched?"),
    question("What’s in your browser history?", "What’s in your fridge?"),
    question("How do you know you are in love?", "How do you know you have diarrhea?"),
    question("What do you do when you get caught?", "What do you do when you win?"),
    question("Describe your boss.", "Describe your pet."),
    question("What size is your shoe?", "What size is your... heart?"),
    question("What is the worst way to die?", "What is the best way to sleep?"),
    question("What smells like fish?", "What smells like flowers?"),
    question("What is sticky?", "What is slippery?"),
    question("What makes you vomit?", "What makes you smile?"),
    question("What is scary in the dark?", "What is beautiful in the dark?"),
    question("What do you do with a dead body?", "What do you do with a sleeping baby?"),
    question("What is the worst sound in the world?", "What is the most relaxing sound?"),
    question("Who is the ugliest person here?", "Who is the smartest person here?"),
    question("What is your guilty pleasure?", "What is your daily routine?"),
    question(
        "How do you act when you are drunk?",
        "How do you act when you are at a job interview?",
    ),
    question("What does poop taste like?", "What does chocolate taste like?"),
    question("What is forbidden?", "What is free?"),
    question("How do you kill time?", "How do you kill a vampire?"),
    question("What is loud?", "What is silent?"),
    question("What is hard?", "What is soft?"),
    question("What is wet?", "What is dry?"),
    question("What is long?", "What is short?"),
    question("What is deep?", "What is shallow?"),
    word("Toothbrush", "Toilet Brush"),
    word("Shampoo", "Glue"),
    word("Spoon", "Shovel"),
    word("Plate", "Frisbee"),
    word("Cup", "Bucket"),
    word("Pillow", "Rock"),
    word("Blanket", "Towel"),
    word("Bed", "Coffin"),
    word("Door", "Wall"),
    word("Window", "Mirror"),
    word("Chair", "Toilet"),
    word("Table", "Floor"),
    word("Knife", "Sword"),
    word("Fork", "Trident"),
    word("Clock", "Compass"),
    word("Fan", "Typhoon"),
    word("Trash Can", "Treasure Chest"),
    word("Rug", "Map"),
    word("Key", "Coin"),
    word("Apple", "Onion"),
    word("Sugar", "Salt"),
    word("Banana", "Sausage"),
    word("Bread", "Sponge"),
    word("Soup", "Dishwater"),
    word("Rice", "Maggots"),
    word("Chocolate", "Poop"),
    word("Ice Cream", "Soap"),
    word("Cake", "Cardboard"),
    word("Chicken", "Pigeon"),
    word("Beef", "Rat"),
    word("Fish", "Slipper"),
    word("Egg", "Ping Pong Ball"),
    word("Milk", "Paint"),
    word("Water", "Vinegar"),
    word("Coffee", "Mud"),
    word("Tea", "Pee"),
    word("Candy", "Medicine"),
    word("Hair", "Spaghetti"),
    word("Eyes", "Cameras"),
    word("Nose", "Button"),
    word("Teeth", "Corn"),
    word("Tongue", "Slug"),
    word("Hand", "Foot"),
    word("Finger", "Toe"),
    word("Belly", "Balloon"),
    word("Butt", "Peach"),
    word("Skin", "Leather"),
    word("Blood", "Ketchup"),
    word("Sweat", "Rain"),
    word("Tears", "Saliva"),
    word("Wig", "Mop"),
    word("Makeup", "Paint"),
    word("Perfume", "Baygon"),
    word("Sun", "Lightbulb"),
    word("Moon", "Cheese"),
    word("Star", "Diamond"),
    word("Cloud", "Cotton"),
    word("Rain", "Shower"),
    word("Tree", "Broccoli"),
    word("Flower", "Weed"),
    word("Grass", "Carpet"),
    word("Dog", "Wolf"),
    word("Cat", "Tiger"),
    word("Bird", "Drone"),
    word("Fish", "Submarine"),
    word("Snake", "Rope"),
    word("Spider", "Hand"),
    word("Monkey", "Human"),
    word("Cow", "Car"),
    word("Pig", "Bank"),
    word("Phone", "Calculator"),
    word("Laptop", "Book"),
    word("Camera", "Gun"),
    word("Car", "Carriage"),
    word("Bike", "Wheelchair"),
    word("Plane", "Bird"),
    word("Boat", "Bathtub"),
    word("Train", "Centipede"),
    word("Ball", "Egg"),
    word("Balloon", "Condom"),
    word("Doll", "Baby"),
    word("Robot", "Zombie"),
    word("Ghost", "Sheet"),
    word("Alien", "Tourist"),
    word("Vampire", "Mosquito"),
    word("Zombie", "Drunkard"),
    word("Witch", "Mother-in-law"),
    word("Dragon", "Lizard"),
    word("Love", "Obsession"),
    word("Hate", "Indifference"),
    word("War", "Argument"),
    word("Peace", "Silence"),
    word("Dream", "Movie"),
    word("Nightmare", "Reality"),
    word("Heaven", "Vacation"),
    word("Hell", "Work"),
    word("Future", "Tomorrow"),
    word("Past", "History"),
    word("Secret", "Gossip"),
    word("Lie", "Joke"),
    word("Truth", "Insult"),
    word("Balut", "Egg"),
    word("Taho", "Tokwa"),
    word("Jeepney", "Bus"),
    word("Tricycle", "Motorcycle"),
    word("Karaoke", "Concert"),
    word("Fiesta", "Riot"),
    word("Siopao", "Cat"),
    word("Sari-sari Store", "Mall"),
    word("Tabo", "Dipper"),
    word("Tsinelas", "Weapon"),
];

/// Picks a prompt pair whose index is not in `used_indices`.
///
/// Falls back to an unconstrained pick once every entry has been used, so a
/// long session repeats prompts rather than failing.
pub fn pick_unused(
    used_indices: &[usize],
    rng: &mut dyn DeterministicRng,
) -> (&'static PromptPair, usize) {
    let available: Vec<usize> = (0..PROMPTS.len())
        .filter(|index| !used_indices.contains(index))
        .collect();

    let index = if available.is_empty() {
        pick_index(PROMPTS.len(), rng)
    } else {
        available[pick_index(available.len(), rng)]
    };

    (&PROMPTS[index], index)
}
